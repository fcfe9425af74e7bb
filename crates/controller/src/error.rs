use crate::desktop::Desktop;
use tessellate_layout::LayoutError;
use thiserror::Error;

/// Errors raised by a tiling driver.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error("Driver rejected the operation: {0}")]
    Rejected(String),
}

/// Errors that can occur while reconciling clients with drivers.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("Driver for desktop {desktop} failed: {source}")]
    Driver {
        desktop: Desktop,
        #[source]
        source: DriverError,
    },

    #[error("Screen {0} has no root tile")]
    MissingRootTile(usize),
}

impl ControllerError {
    pub(crate) fn driver(desktop: &Desktop) -> impl FnOnce(DriverError) -> Self + '_ {
        move |source| ControllerError::Driver {
            desktop: desktop.clone(),
            source,
        }
    }
}
