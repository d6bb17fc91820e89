// doc constants
pub const DOC_ID: &str = "id";
pub const FIELD_SEPARATOR: &str = ".";

// filter operators
pub const OP_AND: &str = "$and";
pub const OP_OR: &str = "$or";
pub const OP_NOT: &str = "$not";
pub const OP_EQ: &str = "$eq";
pub const OP_NE: &str = "$ne";
pub const OP_GT: &str = "$gt";
pub const OP_GTE: &str = "$gte";
pub const OP_LT: &str = "$lt";
pub const OP_LTE: &str = "$lte";
pub const OP_EXISTS: &str = "$exists";
pub const OP_IN: &str = "$in";
pub const OP_NIN: &str = "$nin";
pub const OP_CONTAINS: &str = "$contains";
pub const OP_REGEX: &str = "$regex";

// update operators
pub const OP_SET: &str = "$set";
pub const OP_UNSET: &str = "$unset";
pub const OP_INC: &str = "$inc";
pub const OP_PUSH: &str = "$push";

// event bus topic every collection publishes on
pub const COLLECTION_EVENT: &str = "collection_event";

// store constants
pub const COLLECTION_FILE_EXTENSION: &str = "json";
pub const TEMP_FILE_SUFFIX: &str = ".tmp";
pub const MAX_NAME_LENGTH: usize = 128;

pub const RTD_VERSION: &str = env!("CARGO_PKG_VERSION");
