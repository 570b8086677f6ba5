use std::future::Future;

use reqwest::{Client, Request, Response};

use crate::errors::Error;

/// Sends a fully built request and yields the raw response.
///
/// The guard uses the same transport for the refresh call and for the
/// forwarded request.
pub trait Transport: Send + Sync {
    fn proceed(&self, request: Request) -> impl Future<Output = Result<Response, Error>> + Send;
}

impl Transport for Client {
    fn proceed(&self, request: Request) -> impl Future<Output = Result<Response, Error>> + Send {
        let pending = self.execute(request);
        async move { Ok(pending.await?) }
    }
}
