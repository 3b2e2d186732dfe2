/// The observed outcome of one request: the status code and the body, if one could be parsed.
///
/// Parsing is deliberately fallible without being an error. A missing or malformed body leaves
/// `body` as `None` and downstream stages handle the absence explicitly.
#[derive(Clone, Debug)]
pub struct ApiResponse<T> {
    pub status: u16,
    pub body: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn new(status: u16, body: Option<T>) -> Self {
        Self { status, body }
    }

    pub fn is_status(&self, expected: u16) -> bool {
        self.status == expected
    }

    pub fn body(&self) -> Option<&T> {
        self.body.as_ref()
    }
}
