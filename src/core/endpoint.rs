//! Purpose: Parse catalogue endpoint URLs before a request is issued.
//! Exports: `parse_endpoint`.
//! Invariants: Only http/https endpoints are accepted.
//! Invariants: Path and query are preserved; CSW endpoints commonly carry both.
use super::error::{Error, ErrorKind};
use url::Url;

pub fn parse_endpoint(raw: &str) -> Result<Url, Error> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("catalogue endpoint is empty")
            .with_hint("Pass --endpoint with the CSW service URL, e.g. http://host/csw."));
    }
    let url = Url::parse(trimmed).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("invalid catalogue endpoint url")
            .with_endpoint(trimmed)
            .with_source(err)
    })?;
    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("catalogue endpoint must use http or https scheme")
            .with_endpoint(trimmed));
    }
    Ok(url)
}
