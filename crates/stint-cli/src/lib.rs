pub mod autosave;
pub mod input;
pub mod menu;
pub mod session;

pub use autosave::*;
pub use input::*;
pub use menu::*;
pub use session::*;

#[cfg(test)]
mod tests {
    use std::any::TypeId;

    #[test]
    fn crate_root_reexports_cli_types() {
        assert_eq!(
            TypeId::of::<crate::AutosavePump>(),
            TypeId::of::<crate::autosave::AutosavePump>()
        );
        assert_eq!(
            TypeId::of::<crate::TimerCommand>(),
            TypeId::of::<crate::input::TimerCommand>()
        );
        assert_eq!(
            TypeId::of::<crate::MenuContext>(),
            TypeId::of::<crate::menu::MenuContext>()
        );
        assert_eq!(
            TypeId::of::<crate::SessionOutcome>(),
            TypeId::of::<crate::session::SessionOutcome>()
        );
    }
}
