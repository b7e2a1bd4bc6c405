use actix_web::dev::ServiceResponse;
use actix_web::middleware::ErrorHandlerResponse;
use actix_web::ResponseError;

use crate::server::handler::ApiError;

/// Rewrite the default 404 response into the common json error format
pub(crate) fn handle_not_found<B>(
    res: ServiceResponse<B>,
) -> actix_web::Result<ErrorHandlerResponse<B>> {
    let (req, _) = res.into_parts();
    let res = ApiError::NotFound.error_response().map_into_right_body();

    Ok(ErrorHandlerResponse::Response(ServiceResponse::new(
        req, res,
    )))
}
