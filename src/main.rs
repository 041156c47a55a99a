use rocket::launch;

#[launch]
fn launch() -> _ {
    loops_public_api::rocket()
}
