//! Window state model
//!
//! Four independent flags, derived from ICCCM `WM_STATE` and EWMH
//! `_NET_WM_STATE`. Only one presentation is derived from them at a time:
//! minimized wins over fullscreen, which wins over maximized.

use x11rb::protocol::xproto::Atom;

use crate::shell::Presentation;
use crate::wm::atoms::Atoms;

/// ICCCM `WM_STATE` values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum WmState {
    Withdrawn = 0,
    Normal = 1,
    Iconic = 3,
}

impl WmState {
    pub fn from_raw(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Withdrawn),
            1 => Some(Self::Normal),
            3 => Some(Self::Iconic),
            _ => None,
        }
    }
}

/// Action field of a `_NET_WM_STATE` client message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetWmStateAction {
    Remove = 0,
    Add = 1,
    Toggle = 2,
}

impl NetWmStateAction {
    pub fn from_raw(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Remove),
            1 => Some(Self::Add),
            2 => Some(Self::Toggle),
            _ => None,
        }
    }

    fn apply(self, flag: &mut bool) {
        match self {
            Self::Remove => *flag = false,
            Self::Add => *flag = true,
            Self::Toggle => *flag = !*flag,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowState {
    pub withdrawn: bool,
    pub minimized: bool,
    pub maximized: bool,
    pub fullscreen: bool,
}

impl Default for WindowState {
    /// A new window is withdrawn until it is mapped
    fn default() -> Self {
        Self {
            withdrawn: true,
            minimized: false,
            maximized: false,
            fullscreen: false,
        }
    }
}

impl WindowState {
    /// Effective presentation; `withdrawn` is ignored
    pub fn presentation(&self) -> Presentation {
        if self.minimized {
            Presentation::Minimized
        } else if self.fullscreen {
            Presentation::Fullscreen
        } else if self.maximized {
            Presentation::Maximized
        } else {
            Presentation::Restored
        }
    }

    /// Fold a presentation reported by the shell back onto the flags
    pub fn updated_from(&self, presentation: Presentation) -> Self {
        let mut updated = *self;
        // A window with a shell-side presentation is never withdrawn
        updated.withdrawn = false;

        match presentation {
            Presentation::Hidden | Presentation::Minimized => {
                updated.minimized = true;
            }
            Presentation::Fullscreen => {
                updated.minimized = false;
                updated.fullscreen = true;
            }
            Presentation::Maximized | Presentation::VertMaximized | Presentation::HorizMaximized => {
                updated.minimized = false;
                updated.maximized = true;
                updated.fullscreen = false;
            }
            Presentation::Restored | Presentation::Unknown | Presentation::Attached => {
                updated.minimized = false;
                updated.maximized = false;
                updated.fullscreen = false;
            }
        }

        updated
    }

    pub fn wm_state(&self) -> WmState {
        if self.withdrawn {
            WmState::Withdrawn
        } else if self.minimized {
            WmState::Iconic
        } else {
            WmState::Normal
        }
    }

    /// `_NET_WM_STATE` contents, or `None` when the property must be removed
    pub fn net_wm_state_atoms(&self, atoms: &Atoms) -> Option<Vec<Atom>> {
        if self.withdrawn {
            return None;
        }

        let mut states = Vec::with_capacity(4);
        if self.minimized {
            states.push(atoms.net_wm_state_hidden);
        }
        if self.maximized {
            states.push(atoms.net_wm_state_maximized_horz);
            states.push(atoms.net_wm_state_maximized_vert);
        }
        if self.fullscreen {
            states.push(atoms.net_wm_state_fullscreen);
        }
        Some(states)
    }

    /// Apply a `_NET_WM_STATE` request naming up to two state atoms
    pub fn apply_net_wm_state(&mut self, action: NetWmStateAction, properties: [Atom; 2], atoms: &Atoms) {
        for property in properties {
            // A zero second property means only one was given
            if property == x11rb::NONE {
                continue;
            }

            if property == atoms.net_wm_state_hidden {
                action.apply(&mut self.minimized);
            } else if property == atoms.net_wm_state_maximized_horz {
                // Vertical is assumed to come along with horizontal
                action.apply(&mut self.maximized);
            } else if property == atoms.net_wm_state_fullscreen {
                action.apply(&mut self.fullscreen);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_atoms;
    use proptest::prelude::*;

    fn any_state() -> impl Strategy<Value = WindowState> {
        (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
            |(withdrawn, minimized, maximized, fullscreen)| WindowState {
                withdrawn,
                minimized,
                maximized,
                fullscreen,
            },
        )
    }

    fn any_presentation() -> impl Strategy<Value = Presentation> {
        prop_oneof![
            Just(Presentation::Unknown),
            Just(Presentation::Restored),
            Just(Presentation::Minimized),
            Just(Presentation::Maximized),
            Just(Presentation::VertMaximized),
            Just(Presentation::HorizMaximized),
            Just(Presentation::Fullscreen),
            Just(Presentation::Attached),
            Just(Presentation::Hidden),
        ]
    }

    proptest! {
        #[test]
        fn prop_presentation_precedence(state in any_state()) {
            let expected = if state.minimized {
                Presentation::Minimized
            } else if state.fullscreen {
                Presentation::Fullscreen
            } else if state.maximized {
                Presentation::Maximized
            } else {
                Presentation::Restored
            };
            prop_assert_eq!(state.presentation(), expected);

            let mut withdrawn = state;
            withdrawn.withdrawn = !state.withdrawn;
            prop_assert_eq!(withdrawn.presentation(), expected);
        }

        #[test]
        fn prop_update_then_present_is_idempotent(state in any_state(), presentation in any_presentation()) {
            let updated = state.updated_from(presentation);
            prop_assert!(!updated.withdrawn);

            let again = updated.updated_from(updated.presentation());
            prop_assert_eq!(again, updated);
            prop_assert_eq!(again.presentation(), updated.presentation());
        }
    }

    #[test]
    fn test_default_is_withdrawn() {
        let state = WindowState::default();
        assert_eq!(state.wm_state(), WmState::Withdrawn);
        assert_eq!(state.presentation(), Presentation::Restored);
        assert!(state.net_wm_state_atoms(&test_atoms()).is_none());
    }

    #[test]
    fn test_flags_survive_withdrawal() {
        let atoms = test_atoms();
        let mut state = WindowState::default().updated_from(Presentation::Maximized);
        state.withdrawn = true;
        assert!(state.maximized);

        state.withdrawn = false;
        assert_eq!(state.presentation(), Presentation::Maximized);
        assert_eq!(
            state.net_wm_state_atoms(&atoms),
            Some(vec![atoms.net_wm_state_maximized_horz, atoms.net_wm_state_maximized_vert])
        );
    }

    #[test]
    fn test_hidden_keeps_other_flags() {
        let state = WindowState {
            withdrawn: false,
            minimized: false,
            maximized: true,
            fullscreen: true,
        }
        .updated_from(Presentation::Hidden);

        assert!(state.minimized && state.maximized && state.fullscreen);
        assert_eq!(state.wm_state(), WmState::Iconic);
    }

    #[test]
    fn test_net_wm_state_toggle_twice() {
        let atoms = test_atoms();
        let mut state = WindowState::default();
        let properties = [atoms.net_wm_state_fullscreen, 0];

        state.apply_net_wm_state(NetWmStateAction::Toggle, properties, &atoms);
        assert!(state.fullscreen);
        state.apply_net_wm_state(NetWmStateAction::Toggle, properties, &atoms);
        assert!(!state.fullscreen);
    }

    #[test]
    fn test_net_wm_state_ignores_unknown_atoms() {
        let atoms = test_atoms();
        let mut state = WindowState::default();
        state.apply_net_wm_state(
            NetWmStateAction::Add,
            [atoms.net_wm_state_maximized_horz, 9999],
            &atoms,
        );
        assert!(state.maximized);
        assert!(!state.minimized && !state.fullscreen);
    }

    #[test]
    fn test_wm_state_values() {
        assert_eq!(WmState::from_raw(1), Some(WmState::Normal));
        assert_eq!(WmState::from_raw(3), Some(WmState::Iconic));
        assert_eq!(WmState::from_raw(2), None);
        assert_eq!(NetWmStateAction::from_raw(3), None);
    }
}
