mod client;
mod error;
mod response;

pub mod prelude {
    pub use crate::client::HttpClientInstrumented as HttpClient;
    pub use crate::error::HttpError;
    pub use crate::response::HttpResponse;
}
