//! Status-bar command menus.
//!
//! Every settable — build command, configuration, toolchain, architecture,
//! run target, build strategy, build-path style — is an instance of the same
//! state machine ([`CommandMenu`]): an ordered menu, an optional selection,
//! a visibility flag, and a persisted last choice. The setting-specific
//! wrappers add the visibility rules that hang off the current build command
//! and toolchain.

mod command_menu;
mod menu_set;

pub use command_menu::CommandMenu;
pub use menu_set::MenuSet;
