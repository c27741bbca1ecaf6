//! Panel-side state: backlog handshake and the filtered request table

mod activation;
mod view;

pub use activation::activate;
pub use view::PanelView;
