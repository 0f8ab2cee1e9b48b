//! Kubernetes label/annotation strings, held bit-exact so that pods created
//! by the submission pipeline and pods read back by this crate agree.

pub const SPARK_APP_SELECTOR_LABEL: &str = "spark-app-selector";
pub const SPARK_APP_TAG_LABEL: &str = "spark-app-tag";
pub const SPARK_ROLE_LABEL: &str = "spark-role";
pub const SPARK_EXEC_ID_LABEL: &str = "spark-exec-id";
pub const SPARK_UI_URL_LABEL: &str = "spark-ui-url";
pub const CREATED_BY_LABEL: &str = "created-by";
pub const CREATED_BY_VALUE: &str = "livy";

pub const SPARK_ROLE_DRIVER: &str = "driver";
pub const SPARK_ROLE_EXECUTOR: &str = "executor";

pub const SPARK_UI_PORT: i32 = 4040;
pub const SPARK_UI_PORT_NAME: &str = "spark-ui";
