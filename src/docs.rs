use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::modules::auth::controller::{ErrorResponse, ProfileResponse};
use crate::modules::auth::model::{
    ActivationCodeRequest, LoginRequest, MessageResponse, RegisterRequestDto, TokenPair,
};
use crate::modules::users::model::UserRole;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::auth::controller::register,
        crate::modules::auth::controller::login,
        crate::modules::auth::controller::refresh_token,
        crate::modules::auth::controller::confirm_account,
        crate::modules::auth::controller::generate_activation_code,
        crate::modules::auth::controller::logout,
        crate::modules::auth::controller::me,
    ),
    components(
        schemas(
            RegisterRequestDto,
            LoginRequest,
            TokenPair,
            ActivationCodeRequest,
            MessageResponse,
            ProfileResponse,
            ErrorResponse,
            UserRole,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Registration, login, token refresh and account activation")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
