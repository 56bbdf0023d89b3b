pub mod forms;
pub mod headers;
pub mod responses;

#[allow(unused_imports)]
pub use forms::parse_form_body;
#[allow(unused_imports)]
pub use headers::get_cookie;
#[allow(unused_imports)]
pub use responses::{access_denied, deliver_resource, full, internal_error, not_found};
