use loops_public_api::session::{assign_session, TRACK_COOKIE_NAME};
use loops_public_api::test_support::TestRocketBuilder;
use rocket::http::CookieJar;
use rocket::{get, routes};

#[get("/whoami")]
fn whoami(cookies: &CookieJar<'_>) -> String {
    assign_session(cookies, false)
}

#[test]
fn session_cookie_is_reused_across_requests() {
    let client = TestRocketBuilder::new()
        .mount_routes(routes![whoami])
        .blocking_client();

    let first = client.get("/whoami").dispatch();
    let first_id = first.into_string().unwrap();
    let cookie = client
        .cookies()
        .get(TRACK_COOKIE_NAME)
        .expect("session cookie should be set")
        .value()
        .to_string();
    assert_eq!(cookie, first_id);

    let second = client.get("/whoami").dispatch();
    let second_id = second.into_string().unwrap();

    assert_eq!(first_id, second_id);
}

#[test]
fn fresh_clients_receive_distinct_sessions() {
    let client_a = TestRocketBuilder::new()
        .mount_routes(routes![whoami])
        .blocking_client();
    let client_b = TestRocketBuilder::new()
        .mount_routes(routes![whoami])
        .blocking_client();

    let id_a = client_a.get("/whoami").dispatch().into_string().unwrap();
    let id_b = client_b.get("/whoami").dispatch().into_string().unwrap();

    assert_ne!(id_a, id_b);
}
