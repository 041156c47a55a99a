use loops_public_api::routes::health::healthz;
use loops_public_api::test_support::TestRocketBuilder;
use rocket::http::Status;
use rocket::routes;

#[test]
fn healthz_returns_ok() {
    let client = TestRocketBuilder::new()
        .mount_routes(routes![healthz])
        .blocking_client();

    let response = client.get("/healthz").dispatch();
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(response.into_string().unwrap(), "ok");
}
