use std::collections::HashSet;

use time::PrimitiveDateTime;

pub trait FailureRepository {
    /// Record (or refresh) failures for the given image names
    fn record_failures(
        &self,
        image_names: &[String],
        at: PrimitiveDateTime,
    ) -> impl Future<Output = anyhow::Result<()>>;

    fn failed_image_names(&self) -> impl Future<Output = anyhow::Result<HashSet<String>>>;

    /// Forget a failure, e.g. after the image was read successfully on retry
    fn clear_failure(&self, image_name: &str) -> impl Future<Output = anyhow::Result<()>>;

    /// Move stored readings to the failure table in one transaction
    fn mark_as_failures(
        &self,
        image_names: &[String],
        at: PrimitiveDateTime,
    ) -> impl Future<Output = anyhow::Result<()>>;
}
