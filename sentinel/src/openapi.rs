//! OpenAPI documentation, served at `/api-docs/openapi.json` and rendered at `/docs`.

use utoipa::OpenApi;

use crate::api::handlers::costs;
use crate::errors::ErrorBody;
use crate::report::{CostRecord, CostReport};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Cost Sentinel API",
        description = "AWS cost line items queried from the Cost and Usage Report through Athena."
    ),
    paths(costs::get_costs, costs::export_csv),
    components(schemas(CostReport, CostRecord, ErrorBody)),
    tags((name = "costs", description = "Cost report"))
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_document_lists_report_paths() {
        let doc = serde_json::to_string(&ApiDoc::openapi()).unwrap();
        assert!(doc.contains("Cost Sentinel API"));
        assert!(doc.contains("/costs"));
        assert!(doc.contains("/costs.csv"));
        assert!(doc.contains("total_monthly"));
    }
}
