//! Request handlers - transport-neutral routing over the core operations.
//!
//! A request is a method, a path and an optional JSON body; a response is a
//! status code and a JSON body. Paths may carry an `/api` prefix, and plan
//! routes may be nested under `/longterm`.

use crate::{
    core::{
        item::{self, NewLineItem},
        period::{self, ReplacePeriodsRequest},
        plan::{self, NewPlan, PlanSummary},
        projection::load_plan_projection,
        template::{self, NewTemplate},
        validator::PeriodDescriptor,
    },
    entities::Category,
    errors::{Error, Result},
};
use sea_orm::DatabaseConnection;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use std::{fmt, str::FromStr};
use tracing::{debug, error, instrument};

/// Request method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Read
    Get,
    /// Create
    Post,
    /// Replace
    Put,
    /// Remove
    Delete,
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            other => Err(Error::Validation {
                message: format!("Unsupported method '{other}'"),
            }),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// Status code plus JSON body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    /// HTTP-style status code
    pub status: u16,
    /// Response body; `null` for 204
    pub body: Value,
}

impl ApiResponse {
    fn json<T: Serialize>(status: u16, value: &T) -> Result<Self> {
        Ok(Self {
            status,
            body: serde_json::to_value(value)?,
        })
    }

    const fn no_content() -> Self {
        Self {
            status: 204,
            body: Value::Null,
        }
    }

    fn not_found(path: &str) -> Self {
        Self {
            status: 404,
            body: json!({"error": "route_not_found", "detail": format!("No route for {path}")}),
        }
    }

    fn method_not_allowed(method: Method, path: &str) -> Self {
        Self {
            status: 405,
            body: json!({
                "error": "method_not_allowed",
                "detail": format!("{method} is not allowed on {path}"),
            }),
        }
    }

    /// Error response with its mapped status.
    #[must_use]
    pub fn from_error(err: &Error) -> Self {
        Self {
            status: status_for(err),
            body: json!({"error": err.code(), "detail": err.to_string()}),
        }
    }
}

/// Status code for an error: 404 for missing resources, 422 for other input
/// errors, 500 for everything else.
#[must_use]
pub const fn status_for(err: &Error) -> u16 {
    match err {
        Error::PlanNotFound { .. }
        | Error::TemplateNotFound { .. }
        | Error::UnknownTemplate { .. }
        | Error::ItemNotFound { .. } => 404,
        _ if err.is_input_error() => 422,
        _ => 500,
    }
}

/// Decodes the body of `PUT .../plans/{id}/periods`: a bare array of periods
/// or an object with settings fields and `periods`.
fn decode_replace(body: Option<&str>) -> Result<ReplacePeriodsRequest> {
    let invalid = |e: serde_json::Error| Error::InvalidPayload {
        message: e.to_string(),
    };
    match decode::<Value>(body)? {
        periods @ Value::Array(_) => serde_json::from_value::<Vec<PeriodDescriptor>>(periods)
            .map(ReplacePeriodsRequest::from)
            .map_err(invalid),
        request @ Value::Object(_) => serde_json::from_value(request).map_err(invalid),
        other => Err(Error::InvalidPayload {
            message: format!("expected an array of periods or an object, got {other}"),
        }),
    }
}

enum Route {
    Items(Category),
    Item(Category, i64),
    Templates(Category),
    Template(Category, i64),
    Plans,
    Plan(i64),
    PlanPeriods(i64),
}

fn parse_route(path: &str) -> Option<Route> {
    fn id(raw: &str) -> Option<i64> {
        raw.parse().ok()
    }

    let path = path.split('?').next().unwrap_or_default();
    let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.first() == Some(&"api") {
        segments.remove(0);
    }
    if segments.first() == Some(&"longterm") {
        segments.remove(0);
    }

    match segments.as_slice() {
        ["plans"] => Some(Route::Plans),
        ["plans", plan_id] => id(plan_id).map(Route::Plan),
        ["plans", plan_id, "periods"] => id(plan_id).map(Route::PlanPeriods),
        ["templates", category] => category.parse().ok().map(Route::Templates),
        ["templates", category, template_id] => {
            Some(Route::Template(category.parse().ok()?, id(template_id)?))
        }
        [kind] => kind.parse().ok().map(Route::Items),
        [kind, item_id] => Some(Route::Item(kind.parse().ok()?, id(item_id)?)),
        _ => None,
    }
}

fn decode<T: DeserializeOwned>(body: Option<&str>) -> Result<T> {
    let raw = body.ok_or_else(|| Error::InvalidPayload {
        message: "request body is required".to_string(),
    })?;
    serde_json::from_str(raw).map_err(|e| Error::InvalidPayload {
        message: e.to_string(),
    })
}

/// Routes one request and renders the result or the error.
#[instrument(skip(db, body))]
pub async fn dispatch(
    db: &DatabaseConnection,
    method: Method,
    path: &str,
    body: Option<&str>,
) -> ApiResponse {
    let Some(route) = parse_route(path) else {
        return ApiResponse::not_found(path);
    };

    match handle(db, method, route, body).await {
        Ok(Some(response)) => response,
        Ok(None) => ApiResponse::method_not_allowed(method, path),
        Err(err) => {
            let response = ApiResponse::from_error(&err);
            if response.status >= 500 {
                error!("{} {} failed: {}", method, path, err);
            } else {
                debug!("{} {} rejected: {}", method, path, err);
            }
            response
        }
    }
}

async fn handle(
    db: &DatabaseConnection,
    method: Method,
    route: Route,
    body: Option<&str>,
) -> Result<Option<ApiResponse>> {
    let response = match (method, route) {
        (Method::Get, Route::Items(kind)) => {
            ApiResponse::json(200, &item::list_items(db, kind).await?)?
        }
        (Method::Post, Route::Items(kind)) => {
            let new: NewLineItem = decode(body)?;
            ApiResponse::json(201, &item::create_item(db, kind, new).await?)?
        }
        (Method::Get, Route::Item(kind, id)) => {
            ApiResponse::json(200, &item::get_item(db, kind, id).await?)?
        }
        (Method::Delete, Route::Item(kind, id)) => {
            item::delete_item(db, kind, id).await?;
            ApiResponse::no_content()
        }

        (Method::Get, Route::Templates(category)) => {
            ApiResponse::json(200, &template::list_templates(db, category).await?)?
        }
        (Method::Post, Route::Templates(category)) => {
            let new: NewTemplate = decode(body)?;
            ApiResponse::json(201, &template::create_template(db, category, new).await?)?
        }
        (Method::Get, Route::Template(category, id)) => {
            ApiResponse::json(200, &template::get_template(db, category, id).await?)?
        }
        (Method::Delete, Route::Template(category, id)) => {
            template::delete_template(db, category, id).await?;
            ApiResponse::no_content()
        }

        (Method::Get, Route::Plans) => ApiResponse::json(200, &plan::list_plans(db).await?)?,
        (Method::Post, Route::Plans) => {
            let new: NewPlan = decode(body)?;
            let created = plan::create_plan(db, new).await?;
            ApiResponse::json(201, &PlanSummary::from(&created))?
        }
        (Method::Get, Route::Plan(id)) => {
            ApiResponse::json(200, &load_plan_projection(db, id).await?)?
        }
        (Method::Delete, Route::Plan(id)) => {
            plan::delete_plan(db, id).await?;
            ApiResponse::no_content()
        }
        (Method::Put, Route::PlanPeriods(id)) => {
            let request = decode_replace(body)?;
            let projection = period::replace_plan_periods(db, id, request).await?;
            ApiResponse::json(200, &projection)?
        }

        _ => return Ok(None),
    };
    Ok(Some(response))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&Error::PlanNotFound { id: 1 }), 404);
        assert_eq!(
            status_for(&Error::UnknownTemplate {
                category: Category::Expense,
                missing_ids: vec![3]
            }),
            404
        );
        assert_eq!(status_for(&Error::EmptyBatch), 422);
        assert_eq!(
            status_for(&Error::MalformedMonth {
                value: "x".to_string()
            }),
            422
        );
        assert_eq!(
            status_for(&Error::Database(sea_orm::DbErr::Custom("down".to_string()))),
            500
        );
    }

    #[test]
    fn test_parse_route_prefixes() {
        assert!(matches!(parse_route("/api/longterm/plans/4"), Some(Route::Plan(4))));
        assert!(matches!(parse_route("/plans/4/periods"), Some(Route::PlanPeriods(4))));
        assert!(matches!(
            parse_route("/api/templates/expense/2"),
            Some(Route::Template(Category::Expense, 2))
        ));
        assert!(matches!(parse_route("/api/savings"), Some(Route::Items(Category::Saving))));
        assert!(parse_route("/api/plans/abc").is_none());
        assert!(parse_route("/api/bonuses").is_none());
    }

    #[tokio::test]
    async fn test_plan_lifecycle_through_dispatch() -> Result<()> {
        let db = setup_test_db().await?;

        let created = dispatch(
            &db,
            Method::Post,
            "/api/incomes",
            Some(r#"{"name": "Salary", "amount": 3200.5}"#),
        )
        .await;
        assert_eq!(created.status, 201);
        let item_id = created.body["id"].as_i64().unwrap();

        let body = json!({"name": "Job", "income_ids": [item_id]}).to_string();
        let template = dispatch(&db, Method::Post, "/api/templates/income", Some(&body)).await;
        assert_eq!(template.status, 201);
        let template_id = template.body["id"].as_i64().unwrap();

        let plan = dispatch(
            &db,
            Method::Post,
            "/api/longterm/plans",
            Some(r#"{"name": "Household", "starting_balance": 1000}"#),
        )
        .await;
        assert_eq!(plan.status, 201);
        let plan_id = plan.body["id"].as_i64().unwrap();

        let body = json!([
            {"start_month": "2024-01", "end_month": "2024-03", "income_template_ids": [template_id]},
            {"start_month": "2023-05", "end_month": "2023-08"}
        ])
        .to_string();
        let path = format!("/plans/{plan_id}/periods");
        let replaced = dispatch(&db, Method::Put, &path, Some(&body)).await;
        assert_eq!(replaced.status, 200);
        assert_eq!(replaced.body["periods"][0]["start_month"], "2023-05");
        assert_eq!(replaced.body["periods"][1]["income_templates"][0]["name"], "Job");

        let fetched = dispatch(&db, Method::Get, &format!("/plans/{plan_id}"), None).await;
        assert_eq!(fetched.body, replaced.body);
        assert_eq!(fetched.body["starting_balance"], 1000.0);

        let deleted = dispatch(&db, Method::Delete, &format!("/plans/{plan_id}"), None).await;
        assert_eq!(deleted.status, 204);
        let gone = dispatch(&db, Method::Get, &format!("/plans/{plan_id}"), None).await;
        assert_eq!(gone.status, 404);
        assert_eq!(gone.body["error"], "plan_not_found");
        Ok(())
    }

    #[tokio::test]
    async fn test_replace_errors_map_to_statuses() -> Result<()> {
        let db = setup_test_db().await?;
        let plan = create_test_plan(&db, "Plan").await?;
        let path = format!("/api/longterm/plans/{}/periods", plan.id);

        let unknown = dispatch(
            &db,
            Method::Put,
            &path,
            Some(r#"[{"start_month": "2024-01", "end_month": "2024-02", "expense_template_ids": [3]}]"#),
        )
        .await;
        assert_eq!(unknown.status, 404);
        assert_eq!(unknown.body["detail"], "Expense templates not found: [3]");

        let empty = dispatch(&db, Method::Put, &path, Some(r#"{"periods": []}"#)).await;
        assert_eq!(empty.status, 422);
        assert_eq!(empty.body["error"], "empty_batch");

        let malformed = dispatch(
            &db,
            Method::Put,
            &path,
            Some(r#"[{"start_month": "2024-1", "end_month": "2024-02"}]"#),
        )
        .await;
        assert_eq!(malformed.status, 422);
        assert_eq!(malformed.body["error"], "malformed_month");

        let garbage = dispatch(&db, Method::Put, &path, Some("not json")).await;
        assert_eq!(garbage.status, 422);
        assert_eq!(garbage.body["error"], "invalid_payload");

        let scalar = dispatch(&db, Method::Put, &path, Some("42")).await;
        assert_eq!(scalar.status, 422);
        assert_eq!(scalar.body["error"], "invalid_payload");
        Ok(())
    }

    #[tokio::test]
    async fn test_numeric_month_is_reported_as_malformed() -> Result<()> {
        let db = setup_test_db().await?;
        let plan = create_test_plan(&db, "Plan").await?;
        let path = format!("/plans/{}/periods", plan.id);

        let response = dispatch(
            &db,
            Method::Put,
            &path,
            Some(r#"[{"start_month": 202401, "end_month": "2024-02"}]"#),
        )
        .await;
        assert_eq!(response.status, 422);
        assert_eq!(response.body["error"], "malformed_month");
        assert_eq!(
            response.body["detail"],
            "Invalid month format '202401'. Expected YYYY-MM."
        );

        let wrapped = dispatch(
            &db,
            Method::Put,
            &path,
            Some(r#"{"periods": [{"start_month": "2024-01", "end_month": false}]}"#),
        )
        .await;
        assert_eq!(wrapped.body["error"], "malformed_month");
        Ok(())
    }

    #[tokio::test]
    async fn test_field_errors_reach_the_caller() -> Result<()> {
        let db = setup_test_db().await?;
        let plan = create_test_plan(&db, "Plan").await?;
        let path = format!("/plans/{}/periods", plan.id);

        let listed = dispatch(
            &db,
            Method::Put,
            &path,
            Some(r#"[{"start_month": "2024-01", "end_month": "2024-02", "income_template_ids": "7"}]"#),
        )
        .await;
        assert_eq!(listed.status, 422);
        assert_eq!(listed.body["error"], "invalid_payload");
        let detail = listed.body["detail"].as_str().unwrap();
        assert!(detail.contains("invalid type"), "{detail}");
        assert!(!detail.contains("untagged"), "{detail}");

        let wrapped = dispatch(
            &db,
            Method::Put,
            &path,
            Some(r#"{"car_term_months": "soon", "periods": []}"#),
        )
        .await;
        assert_eq!(wrapped.status, 422);
        let detail = wrapped.body["detail"].as_str().unwrap();
        assert!(detail.contains("invalid type"), "{detail}");
        Ok(())
    }

    #[tokio::test]
    async fn test_object_body_updates_settings() -> Result<()> {
        let db = setup_test_db().await?;
        let plan = create_test_plan(&db, "Plan").await?;
        let body = json!({
            "savings_return_rate": 5.5,
            "periods": [{"start_month": "2024-01", "end_month": "2024-01"}]
        })
        .to_string();

        let response = dispatch(
            &db,
            Method::Put,
            &format!("/plans/{}/periods", plan.id),
            Some(&body),
        )
        .await;
        assert_eq!(response.status, 200);
        assert_eq!(response.body["savings_return_rate"], 5.5);
        assert_eq!(response.body["periods"].as_array().unwrap().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_route_and_method() -> Result<()> {
        let db = setup_test_db().await?;
        assert_eq!(dispatch(&db, Method::Get, "/api/nope", None).await.status, 404);
        assert_eq!(dispatch(&db, Method::Put, "/api/plans", None).await.status, 405);
        assert!("PATCH".parse::<Method>().is_err());
        assert_eq!("get".parse::<Method>().unwrap(), Method::Get);
        Ok(())
    }
}
