//! Declarative helpers for wiring actix-web routes.

#[cfg(feature = "actix")]
#[doc(hidden)]
pub mod __private {
    pub use actix_web;
}

/// Generate a `routes` function registering services on a `ServiceConfig`.
///
/// Leaf modules list their handlers:
///
/// ```ignore
/// macros_utils::routes! {
///     route health_route,
/// }
/// ```
///
/// Parent modules declare their children and chain their `routes`:
///
/// ```ignore
/// macros_utils::routes! {
///     mod health,
///     mod ping,
/// }
/// ```
#[cfg(feature = "actix")]
#[macro_export]
macro_rules! routes {
    ($(route $handler:ident),+ $(,)?) => {
        pub fn routes(cfg: &mut $crate::__private::actix_web::web::ServiceConfig) {
            $(cfg.service($handler);)+
        }
    };
    ($(mod $module:ident),+ $(,)?) => {
        $(mod $module;)+

        pub fn routes(cfg: &mut $crate::__private::actix_web::web::ServiceConfig) {
            $($module::routes(cfg);)+
        }
    };
}
