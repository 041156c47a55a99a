//! Root redirect and human-readable API documentation.

use rocket::response::Redirect;

const DOCS_MARKDOWN: &str = r#"# Loops public content API

Read-only API over sent email campaigns and mailing lists, with live
view/click tracking.

## Endpoints

- `GET /mailing_lists?limit=&offset=`
- `GET /emails?limit=&offset=&mailing_list_id=`
- `GET /mailing_lists/emails?group_all=&limit_per_list=`
- `GET /emails/{id}/view`
- `GET /emails/{id}/click/{index}?url=`
- `GET /emails/{id}/stats/stream`
- `GET /healthz`

All JSON responses are indented UTF-8 and carry a weak `ETag`; send
`If-None-Match` to get a `304` on an unchanged response.
"#;

#[get("/")]
pub fn index() -> Redirect {
    Redirect::to("/docs")
}

#[get("/docs")]
pub fn docs() -> (rocket::http::ContentType, &'static str) {
    (rocket::http::ContentType::Plain, DOCS_MARKDOWN)
}
