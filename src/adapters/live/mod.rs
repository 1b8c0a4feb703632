//! Live adapters talking to a real cluster through `kube`.

pub mod discovery;
pub mod store;

pub use discovery::LiveDiscovery;
pub use store::LiveResourceStore;

use crate::ports::StoreError;

/// Maps a `kube` failure onto the store error taxonomy.
///
/// 404 is "not found"; 409 is "already exists" when the API says so and a
/// version conflict otherwise.
pub(crate) fn store_error(err: kube::Error) -> StoreError {
    match err {
        kube::Error::Api(response) => match response.code {
            404 => StoreError::NotFound { message: response.message },
            409 if response.reason == "AlreadyExists" => {
                StoreError::AlreadyExists { message: response.message }
            }
            409 => StoreError::Conflict { message: response.message },
            code => StoreError::Rejected { code, message: response.message },
        },
        kube::Error::SerdeError(e) => StoreError::Malformed { message: e.to_string() },
        other => StoreError::Transport { message: other.to_string() },
    }
}
