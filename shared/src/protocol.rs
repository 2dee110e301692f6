/// Service directory: service name -> tags, filterable with `?tag=`
pub const CATALOG_SERVICES_PATH: &str = "/v1/catalog/services";

/// Endpoint list for one service, including endpoints without health checks
pub const HEALTH_SERVICE_PATH: &str = "/v1/health/service";

pub const CATALOG_REGISTER_PATH: &str = "/v1/catalog/register";
pub const CATALOG_DEREGISTER_PATH: &str = "/v1/catalog/deregister";

/// Query parameter used to narrow the service directory to one tag
pub const TAG_QUERY_PARAM: &str = "tag";
