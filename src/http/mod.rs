pub mod client;
pub mod encoding;
pub mod method;
pub mod request;
pub mod response;
