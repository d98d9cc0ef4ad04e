use reqwest::header::HeaderMap;

/// Decoded payload of a successful call, with the status and headers it arrived with.
#[derive(Debug, Clone)]
pub struct Response<T> {
    pub data: T,
    pub status: u16,
    pub headers: HeaderMap,
}

impl<T> Response<T> {
    pub fn map<U, F>(self, f: F) -> Response<U>
    where
        F: FnOnce(T) -> U,
    {
        Response {
            data: f(self.data),
            status: self.status,
            headers: self.headers,
        }
    }

    pub fn into_data(self) -> T {
        self.data
    }
}
