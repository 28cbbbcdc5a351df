//! OpenAPI 3.1 description of the per-endpoint REST surface.

use serde_json::{json, Value as JsonValue};

pub const API_TITLE: &str = "Conflagent API";

const API_DESCRIPTION: &str = "REST API bridge between Custom GPTs and a sandboxed Confluence root page. \
All page routes must be authenticated using a Bearer token (Authorization: Bearer <token>). \
The API lists, reads, creates, updates, renames and moves Confluence pages under a pre-defined root page, \
addressing them by title or by title path such as 'Parent/Child'.";

fn envelope_schema(data: JsonValue) -> JsonValue {
    json!({
        "type": "object",
        "required": ["success", "code", "message", "data", "timestamp"],
        "properties": {
            "success": {"type": "boolean"},
            "code": {"$ref": "#/components/schemas/StatusCode"},
            "message": {"type": "string"},
            "data": data,
            "timestamp": {"type": "string", "format": "date-time"}
        }
    })
}

fn json_content(schema: JsonValue) -> JsonValue {
    json!({"application/json": {"schema": schema}})
}

fn ok_response(description: &str, data: JsonValue) -> JsonValue {
    json!({"description": description, "content": json_content(envelope_schema(data))})
}

fn error_responses(codes: &[(&str, &str)]) -> serde_json::Map<String, JsonValue> {
    let mut responses = serde_json::Map::new();
    for (status, description) in codes {
        responses.insert(
            status.to_string(),
            json!({
                "description": description,
                "content": {"application/json": {"schema": {"$ref": "#/components/schemas/ErrorEnvelope"}}}
            }),
        );
    }
    responses
}

fn responses(ok: JsonValue, errors: &[(&str, &str)]) -> JsonValue {
    let mut all = error_responses(errors);
    all.insert("200".to_string(), ok);
    all.insert(
        "401".to_string(),
        json!({
            "description": "Unauthorized: missing or invalid bearer token",
            "content": {"application/json": {"schema": {"$ref": "#/components/schemas/ErrorEnvelope"}}}
        }),
    );
    JsonValue::Object(all)
}

fn title_parameter() -> JsonValue {
    json!({
        "name": "title",
        "in": "path",
        "required": true,
        "description": "Page title or title path relative to the root, e.g. 'Parent/Child'",
        "schema": {"type": "string"}
    })
}

fn body_schema(required: &[&str], properties: JsonValue) -> JsonValue {
    json!({
        "required": true,
        "content": json_content(json!({
            "type": "object",
            "required": required,
            "properties": properties
        }))
    })
}

fn paths() -> JsonValue {
    let security = json!([{"BearerAuth": []}]);
    let not_found = ("404", "Not Found: page does not exist under the root");
    let invalid_input = ("400", "Invalid Input: missing or malformed fields");
    let invalid_operation = ("422", "Invalid Operation: duplicate sibling title or circular move");
    let conflict = ("409", "Version Conflict: the page changed concurrently");
    let internal = ("500", "Internal Error: upstream failure");

    json!({
        "/pages": {
            "get": {
                "summary": "List subpages of the root page",
                "description": "Returns the direct children of the configured root page.",
                "operationId": "listSubpages",
                "security": security,
                "responses": responses(
                    ok_response("List of subpages", json!({"type": "array", "items": {"$ref": "#/components/schemas/PageRef"}})),
                    &[internal],
                )
            },
            "post": {
                "summary": "Create a new page",
                "description": "Creates a page under the root, under parentTitle, or under the leading segments of a title path. \
Titles must be unique among siblings. Markdown bodies are converted to Confluence storage format; HTML is kept as is.",
                "operationId": "createPage",
                "security": security,
                "requestBody": body_schema(&["title"], json!({
                    "title": {"type": "string"},
                    "parentTitle": {"type": "string"},
                    "body": {"type": "string", "description": "Markdown or storage-format HTML"}
                })),
                "responses": responses(
                    ok_response("Page created", json!({"$ref": "#/components/schemas/CreatedPage"})),
                    &[invalid_input, not_found, invalid_operation, internal],
                )
            }
        },
        "/pages/tree": {
            "get": {
                "summary": "Depth-limited page tree",
                "description": "Returns the tree under the root, or under startTitle. Depth 0 lists direct children only.",
                "operationId": "getPageTree",
                "security": security,
                "parameters": [
                    {"name": "depth", "in": "query", "required": false, "schema": {"type": "integer", "minimum": 0, "default": 2}},
                    {"name": "startTitle", "in": "query", "required": false, "schema": {"type": "string"}}
                ],
                "responses": responses(
                    ok_response("Page tree", json!({"$ref": "#/components/schemas/TreeNode"})),
                    &[invalid_input, not_found, internal],
                )
            }
        },
        "/pages/rename": {
            "post": {
                "summary": "Rename a page",
                "description": "Changes a page title. Parent and body are preserved.",
                "operationId": "renamePage",
                "security": security,
                "requestBody": body_schema(&["old_title", "new_title"], json!({
                    "old_title": {"type": "string"},
                    "new_title": {"type": "string"}
                })),
                "responses": responses(
                    ok_response("Page renamed", json!({"$ref": "#/components/schemas/RenamedPage"})),
                    &[invalid_input, not_found, conflict, invalid_operation, internal],
                )
            }
        },
        "/pages/{title}": {
            "get": {
                "summary": "Read content of a page by title",
                "description": "Returns the page body in Confluence storage format. Keep internal page links intact in subsequent updates.",
                "operationId": "readPageByTitle",
                "security": security,
                "parameters": [title_parameter()],
                "responses": responses(
                    ok_response("Page content", json!({"$ref": "#/components/schemas/PageContent"})),
                    &[not_found, internal],
                )
            },
            "put": {
                "summary": "Update content of a page by title",
                "description": "Replaces the full page body. Partial or diff updates are not supported.",
                "operationId": "updatePageByTitle",
                "security": security,
                "parameters": [title_parameter()],
                "requestBody": body_schema(&["body"], json!({
                    "body": {"type": "string", "description": "Full Markdown or storage-format content"}
                })),
                "responses": responses(
                    ok_response("Page updated", json!({"$ref": "#/components/schemas/UpdatedPage"})),
                    &[invalid_input, not_found, conflict, internal],
                )
            }
        },
        "/pages/{title}/children": {
            "get": {
                "summary": "List children of a page",
                "operationId": "listChildren",
                "security": security,
                "parameters": [title_parameter()],
                "responses": responses(
                    ok_response("Child pages", json!({"type": "array", "items": {"$ref": "#/components/schemas/ChildEntry"}})),
                    &[not_found, internal],
                )
            }
        },
        "/pages/{title}/parent": {
            "get": {
                "summary": "Parent and breadcrumb of a page",
                "operationId": "getParent",
                "security": security,
                "parameters": [title_parameter()],
                "responses": responses(
                    ok_response("Parent and breadcrumb", json!({"$ref": "#/components/schemas/Breadcrumb"})),
                    &[not_found, internal],
                )
            }
        },
        "/pages/{title}/move": {
            "post": {
                "summary": "Move a page under a new parent",
                "description": "Fails when the new parent is the page itself or one of its descendants.",
                "operationId": "movePage",
                "security": security,
                "parameters": [title_parameter()],
                "requestBody": body_schema(&["newParentTitle"], json!({
                    "newParentTitle": {"type": "string"}
                })),
                "responses": responses(
                    ok_response("Page moved", json!({"$ref": "#/components/schemas/MovedPage"})),
                    &[invalid_input, not_found, conflict, invalid_operation, internal],
                )
            }
        },
        "/health": {
            "get": {
                "summary": "Health check",
                "description": "Checks whether the API server is live. No authentication required.",
                "operationId": "healthCheck",
                "responses": {
                    "200": ok_response("Server is running", json!({
                        "type": "object",
                        "properties": {"status": {"type": "string", "example": "ok"}}
                    }))
                }
            }
        },
        "/openapi.json": {
            "get": {
                "summary": "Get OpenAPI schema",
                "description": "Returns this OpenAPI schema document.",
                "operationId": "getOpenAPISchema",
                "responses": {
                    "200": {"description": "OpenAPI JSON returned", "content": json_content(json!({"type": "object"}))}
                }
            }
        }
    })
}

fn components() -> JsonValue {
    json!({
        "securitySchemes": {
            "BearerAuth": {"type": "http", "scheme": "bearer"}
        },
        "schemas": {
            "StatusCode": {
                "type": "string",
                "enum": ["OK", "INVALID_INPUT", "NOT_FOUND", "VERSION_CONFLICT", "INVALID_OPERATION", "UNAUTHORIZED", "INTERNAL_ERROR"]
            },
            "ErrorEnvelope": envelope_schema(json!({"type": "null"})),
            "PageRef": {
                "type": "object",
                "properties": {"id": {"type": "string"}, "title": {"type": "string"}}
            },
            "PageContent": {
                "type": "object",
                "properties": {"id": {"type": "string"}, "title": {"type": "string"}, "body": {"type": "string"}}
            },
            "ChildEntry": {
                "type": "object",
                "properties": {
                    "id": {"type": "string"},
                    "title": {"type": "string"},
                    "path": {"type": "array", "items": {"type": "string"}}
                }
            },
            "Breadcrumb": {
                "type": "object",
                "properties": {
                    "parent": {"oneOf": [{"$ref": "#/components/schemas/PageRef"}, {"type": "null"}]},
                    "path": {"type": "array", "items": {"type": "string"}}
                }
            },
            "TreeNode": {
                "type": "object",
                "properties": {
                    "id": {"type": "string"},
                    "title": {"type": "string"},
                    "path": {"type": "array", "items": {"type": "string"}},
                    "children": {"type": "array", "items": {"$ref": "#/components/schemas/TreeNode"}}
                }
            },
            "CreatedPage": {
                "type": "object",
                "properties": {"id": {"type": "string"}, "title": {"type": "string"}, "version": {"type": "integer"}}
            },
            "UpdatedPage": {
                "type": "object",
                "properties": {"title": {"type": "string"}, "version": {"type": "integer"}}
            },
            "RenamedPage": {
                "type": "object",
                "properties": {"oldTitle": {"type": "string"}, "newTitle": {"type": "string"}, "version": {"type": "integer"}}
            },
            "MovedPage": {
                "type": "object",
                "properties": {
                    "title": {"type": "string"},
                    "oldParentTitle": {"type": ["string", "null"]},
                    "newParentTitle": {"type": "string"}
                }
            }
        }
    })
}

/// Build the document for one endpoint, with `servers` pointing at it.
pub fn openapi_document(endpoint_name: &str, host_url: &str) -> JsonValue {
    json!({
        "openapi": "3.1.0",
        "info": {
            "title": API_TITLE,
            "version": env!("CARGO_PKG_VERSION"),
            "description": API_DESCRIPTION
        },
        "servers": [{
            "url": format!("{}/endpoint/{}", host_url.trim_end_matches('/'), endpoint_name),
            "description": "Endpoint-specific API"
        }],
        "paths": paths(),
        "components": components()
    })
}
