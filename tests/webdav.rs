//! End-to-end dispatcher tests against the in-memory backend.

use davcore::{Backend, DavHandler};
use http::{Request, StatusCode};

fn handler() -> DavHandler {
    DavHandler::builder(Backend::Mem).memory_locksystem().build()
}

fn req(method: &str, uri: &str, body: impl Into<hyper::Body>) -> Request<hyper::Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(body.into())
        .unwrap()
}

fn req_h(
    method: &str,
    uri: &str,
    headers: &[(&str, &str)],
    body: impl Into<hyper::Body>,
) -> Request<hyper::Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    for (k, v) in headers {
        builder = builder.header(*k, *v);
    }
    builder.body(body.into()).unwrap()
}

async fn body_bytes(res: http::Response<davcore::body::Body>) -> (StatusCode, Vec<u8>) {
    let status = res.status();
    let headers = res.headers().clone();
    let _ = headers;
    let bytes = hyper::body::to_bytes(res.into_body()).await.unwrap();
    (status, bytes.to_vec())
}

#[tokio::test]
async fn mkcol_then_mkcol_again_is_not_allowed() {
    let dav = handler();
    let r1 = dav.handle(req("MKCOL", "/dir/", hyper::Body::empty())).await;
    assert_eq!(r1.status(), StatusCode::CREATED);

    let r2 = dav.handle(req("MKCOL", "/dir/", hyper::Body::empty())).await;
    assert_eq!(r2.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn put_then_get_round_trips_content() {
    let dav = handler();
    let put = dav
        .handle(req("PUT", "/hello.txt", hyper::Body::from("hello")))
        .await;
    assert_eq!(put.status(), StatusCode::CREATED);

    let get = dav.handle(req("GET", "/hello.txt", hyper::Body::empty())).await;
    assert_eq!(get.status(), StatusCode::OK);
    assert_eq!(
        get.headers().get("content-length").unwrap(),
        "5"
    );
    let (_, bytes) = body_bytes(get).await;
    assert_eq!(bytes, b"hello");
}

#[tokio::test]
async fn propfind_depth_one_lists_self_and_children() {
    let dav = handler();
    assert_eq!(
        dav.handle(req("MKCOL", "/d/", hyper::Body::empty())).await.status(),
        StatusCode::CREATED
    );
    assert_eq!(
        dav.handle(req("PUT", "/d/f.txt", hyper::Body::from("x"))).await.status(),
        StatusCode::CREATED
    );

    let res = dav
        .handle(req_h("PROPFIND", "/d/", &[("depth", "1")], hyper::Body::empty()))
        .await;
    assert_eq!(res.status(), StatusCode::MULTI_STATUS);
    let (_, bytes) = body_bytes(res).await;
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.contains("/d/"));
    assert!(text.contains("/d/f.txt"));
}

#[tokio::test]
async fn lock_protects_against_unlocked_put_then_unlock_releases_it() {
    let dav = handler();
    assert_eq!(
        dav.handle(req("PUT", "/locked.txt", hyper::Body::from("a"))).await.status(),
        StatusCode::CREATED
    );

    let lockinfo = r#"<?xml version="1.0" encoding="utf-8"?>
<D:lockinfo xmlns:D="DAV:">
  <D:lockscope><D:exclusive/></D:lockscope>
  <D:locktype><D:write/></D:locktype>
  <D:owner>tester</D:owner>
</D:lockinfo>"#;
    let lock_res = dav
        .handle(req("LOCK", "/locked.txt", hyper::Body::from(lockinfo)))
        .await;
    assert_eq!(lock_res.status(), StatusCode::OK);
    let token = lock_res
        .headers()
        .get("lock-token")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();

    let put_without_token = dav
        .handle(req("PUT", "/locked.txt", hyper::Body::from("b")))
        .await;
    assert_eq!(put_without_token.status(), StatusCode::LOCKED);

    let unlock = dav
        .handle(req_h(
            "UNLOCK",
            "/locked.txt",
            &[("lock-token", &token)],
            hyper::Body::empty(),
        ))
        .await;
    assert_eq!(unlock.status(), StatusCode::NO_CONTENT);

    let put_after_unlock = dav
        .handle(req("PUT", "/locked.txt", hyper::Body::from("c")))
        .await;
    assert_eq!(put_after_unlock.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn copy_with_overwrite_false_fails_once_destination_exists() {
    let dav = handler();
    assert_eq!(
        dav.handle(req("PUT", "/src.txt", hyper::Body::from("1"))).await.status(),
        StatusCode::CREATED
    );

    let copy1 = dav
        .handle(req_h(
            "COPY",
            "/src.txt",
            &[("destination", "/dst.txt"), ("overwrite", "F")],
            hyper::Body::empty(),
        ))
        .await;
    assert_eq!(copy1.status(), StatusCode::CREATED);

    let copy2 = dav
        .handle(req_h(
            "COPY",
            "/src.txt",
            &[("destination", "/dst.txt"), ("overwrite", "F")],
            hyper::Body::empty(),
        ))
        .await;
    assert_eq!(copy2.status(), StatusCode::PRECONDITION_FAILED);
}

#[tokio::test]
async fn get_with_if_none_match_returns_not_modified() {
    let dav = handler();
    let put = dav
        .handle(req("PUT", "/etag.txt", hyper::Body::from("data")))
        .await;
    assert_eq!(put.status(), StatusCode::CREATED);

    let get = dav.handle(req("GET", "/etag.txt", hyper::Body::empty())).await;
    let etag = get.headers().get("etag").unwrap().to_str().unwrap().to_string();

    let conditional_get = dav
        .handle(req_h(
            "GET",
            "/etag.txt",
            &[("if-none-match", &etag)],
            hyper::Body::empty(),
        ))
        .await;
    assert_eq!(conditional_get.status(), StatusCode::NOT_MODIFIED);
}
