//! OpenAPI 3 description of the REST API, served at `/api/openapi.json`.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error::ErrorBody;
use crate::models::{CreateItemRequest, ItemStatus, PublicUser, Role, UpdateItemRequest, WasteItem};
use crate::rest::{DeletedItem, HealthResponse, ItemList, LoginRequest, LoginResponse};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::rest::health_handler,
        crate::rest::login_handler,
        crate::rest::list_items,
        crate::rest::get_item,
        crate::rest::create_item,
        crate::rest::update_item,
        crate::rest::delete_item,
    ),
    components(schemas(
        HealthResponse,
        LoginRequest,
        LoginResponse,
        PublicUser,
        Role,
        WasteItem,
        ItemStatus,
        ItemList,
        DeletedItem,
        CreateItemRequest,
        UpdateItemRequest,
        ErrorBody,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Liveness"),
        (name = "auth", description = "Username/password login"),
        (name = "items", description = "Waste item records")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
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
