use crate::server::ServerRouter;

mod blogs;
mod login;
mod users;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .merge(blogs::routes())
        .merge(users::routes())
        .merge(login::routes())
}
