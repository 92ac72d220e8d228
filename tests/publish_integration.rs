//! Purpose: End-to-end tests for the publish flow over real HTTP.
//! Role: Drive `Publisher` + `HttpTransport` against a loopback catalogue stub.
//! Invariants: Each test owns its stub; no shared ports.

mod support;

use csw_publish::api::{
    ErrorKind, HttpTransport, PublishOptions, Publisher, StaticForm, TEXT_ACCEPT,
    XML_CONTENT_TYPE, gen_harvest_request,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use support::{Catalogue, TestResult, closed_endpoint};

fn collecting_publisher(
    form: StaticForm,
    transport: HttpTransport,
) -> (Publisher, Arc<Mutex<Vec<String>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let notifier = Arc::new(move |text: &str| sink.lock().unwrap().push(text.to_string()));
    let publisher = Publisher::new(Arc::new(form), Arc::new(transport), notifier);
    (publisher, seen)
}

#[test]
fn publish_posts_harvest_body_and_surfaces_response() -> TestResult<()> {
    let catalogue = Catalogue::ok("OK")?;
    let form = StaticForm::new("service", "http://example.org/wms", catalogue.url.clone());
    let (publisher, seen) = collecting_publisher(form, HttpTransport::new());

    let outcome = publisher.publish()?;

    let received = catalogue.received();
    assert_eq!(received.len(), 1);
    assert_eq!(
        received[0].body,
        gen_harvest_request("service", "http://example.org/wms")
    );
    assert_eq!(received[0].content_type.as_deref(), Some(XML_CONTENT_TYPE));
    assert_eq!(received[0].accept.as_deref(), Some(TEXT_ACCEPT));
    assert_eq!(received[0].authorization, None);
    assert_eq!(outcome.response_text, "OK");
    assert_eq!(*seen.lock().unwrap(), vec!["OK".to_string()]);
    Ok(())
}

#[test]
fn response_xml_is_not_parsed_or_trimmed() -> TestResult<()> {
    let reply = "<?xml version=\"1.0\"?>\n<csw:HarvestResponse/>\n";
    let catalogue = Catalogue::ok(reply)?;
    let form = StaticForm::new("service", "http://example.org/wms", catalogue.url.clone());
    let (publisher, seen) = collecting_publisher(form, HttpTransport::new());

    publisher.publish()?;

    assert_eq!(*seen.lock().unwrap(), vec![reply.to_string()]);
    Ok(())
}

#[test]
fn empty_inputs_send_empty_elements() -> TestResult<()> {
    let catalogue = Catalogue::ok("")?;
    let form = StaticForm::new("", "", catalogue.url.clone());
    let (publisher, _seen) = collecting_publisher(form, HttpTransport::new());

    publisher.publish()?;

    assert_eq!(catalogue.received()[0].body, gen_harvest_request("", ""));
    Ok(())
}

#[test]
fn escape_option_encodes_query_separators() -> TestResult<()> {
    let catalogue = Catalogue::ok("OK")?;
    let form = StaticForm::new(
        "service",
        "http://example.org/wms?service=WMS&request=GetCapabilities",
        catalogue.url.clone(),
    );
    let (publisher, _seen) = collecting_publisher(form, HttpTransport::new());
    let publisher = publisher.with_options(PublishOptions { escape: true });

    publisher.publish()?;

    assert!(
        catalogue.received()[0]
            .body
            .contains("<Source>http://example.org/wms?service=WMS&amp;request=GetCapabilities</Source>")
    );
    Ok(())
}

#[test]
fn token_is_sent_as_bearer() -> TestResult<()> {
    let catalogue = Catalogue::ok("OK")?;
    let form = StaticForm::new("service", "http://example.org/wms", catalogue.url.clone());
    let transport = HttpTransport::new()
        .with_token("s3cret")
        .with_timeout(Duration::from_secs(5));
    let (publisher, _seen) = collecting_publisher(form, transport);

    publisher.publish()?;

    assert_eq!(
        catalogue.received()[0].authorization.as_deref(),
        Some("Bearer s3cret")
    );
    Ok(())
}

#[test]
fn server_error_returns_status_and_body_without_notifying() -> TestResult<()> {
    let catalogue = Catalogue::start(500, "<ows:ExceptionReport/>")?;
    let form = StaticForm::new("service", "http://example.org/wms", catalogue.url.clone());
    let (publisher, seen) = collecting_publisher(form, HttpTransport::new());

    let err = publisher.publish().expect_err("server error");

    assert_eq!(err.kind(), ErrorKind::Remote);
    assert_eq!(err.status(), Some(500));
    assert_eq!(err.detail(), Some("<ows:ExceptionReport/>"));
    assert_eq!(err.endpoint(), Some(catalogue.url.as_str()));
    assert_eq!(catalogue.received().len(), 1);
    assert!(seen.lock().unwrap().is_empty());
    Ok(())
}

#[test]
fn forbidden_maps_to_permission() -> TestResult<()> {
    let catalogue = Catalogue::start(403, "")?;
    let form = StaticForm::new("service", "http://example.org/wms", catalogue.url.clone());
    let (publisher, _seen) = collecting_publisher(form, HttpTransport::new());

    let err = publisher.publish().expect_err("forbidden");

    assert_eq!(err.kind(), ErrorKind::Permission);
    assert_eq!(err.detail(), None);
    Ok(())
}

#[test]
fn unreachable_endpoint_is_io_error() -> TestResult<()> {
    let form = StaticForm::new("service", "http://example.org/wms", closed_endpoint()?);
    let (publisher, seen) = collecting_publisher(form, HttpTransport::new());

    let err = publisher.publish().expect_err("connection refused");

    assert_eq!(err.kind(), ErrorKind::Io);
    assert!(std::error::Error::source(&err).is_some());
    assert!(seen.lock().unwrap().is_empty());
    Ok(())
}

#[test]
fn concurrent_spawns_each_send_and_notify() -> TestResult<()> {
    let catalogue = Catalogue::ok("OK")?;
    let form = StaticForm::new("service", "http://example.org/wms", catalogue.url.clone());
    let (publisher, seen) = collecting_publisher(form, HttpTransport::new());

    let pending = (0..3)
        .map(|_| publisher.spawn())
        .collect::<Result<Vec<_>, _>>()?;
    for handle in pending {
        assert_eq!(handle.wait()?.response_text, "OK");
    }

    assert_eq!(catalogue.received().len(), 3);
    assert_eq!(seen.lock().unwrap().len(), 3);
    Ok(())
}

#[test]
fn responses_over_ten_megabytes_are_delivered_whole() -> TestResult<()> {
    let reply = "x".repeat(11 * 1024 * 1024);
    let catalogue = Catalogue::ok(&reply)?;
    let form = StaticForm::new("service", "http://example.org/wms", catalogue.url.clone());
    let (publisher, seen) = collecting_publisher(form, HttpTransport::new());

    let outcome = publisher.publish()?;

    assert_eq!(outcome.response_text.len(), reply.len());
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].len(), reply.len());
    Ok(())
}

#[test]
fn large_error_bodies_are_kept_as_detail() -> TestResult<()> {
    let reply = "e".repeat(11 * 1024 * 1024);
    let catalogue = Catalogue::start(500, &reply)?;
    let form = StaticForm::new("service", "http://example.org/wms", catalogue.url.clone());
    let (publisher, _seen) = collecting_publisher(form, HttpTransport::new());

    let err = publisher.publish().expect_err("server error");

    assert_eq!(err.kind(), ErrorKind::Remote);
    assert_eq!(err.detail().map(str::len), Some(reply.len()));
    Ok(())
}
