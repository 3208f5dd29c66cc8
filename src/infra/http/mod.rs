//! HTTP surface for the remote invocation boundary.
//!
//! The host CMS owns routing and template-hierarchy resolution; this module
//! only exposes the mountable router that runs explicit method lists against
//! registered models (the AJAX/partial path).

mod remote;

pub use remote::{RemoteState, remote_router};
