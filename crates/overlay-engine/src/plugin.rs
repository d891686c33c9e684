#![forbid(unsafe_code)]

//! Custom popup extensions.

use crate::popup::Popup;

/// Extension installed once when a popup is constructed, after the core
/// listeners and the drag controller. Plugins usually subscribe to
/// lifecycle events through [`Popup::on`].
pub trait PopupPlugin {
    /// Short name used in diagnostics.
    fn name(&self) -> &str;

    fn install(&self, popup: &Popup);
}
