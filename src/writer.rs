use std::path::Path;

use futures::future::try_join_all;
use tracing::debug;

use crate::error::SyncError;
use crate::search::SearchResultItem;

/// `{owner}_{repo}_{path}` with every `/` in the path turned into `_`.
///
/// Different paths can flatten to the same name (`a/b_c` and `a_b/c`); the
/// last write wins.
pub fn flat_file_name(item: &SearchResultItem) -> String {
    format!(
        "{}_{}_{}",
        item.owner(),
        item.repo_name(),
        item.path.replace('/', "_")
    )
}

/// Write every item that has content into `output_dir`, creating it if
/// needed. All writes run concurrently; the first failure fails the page.
/// Returns how many files were written.
pub async fn write_matches(
    output_dir: &Path,
    items: &[SearchResultItem],
    contents: &[Option<String>],
) -> Result<usize, SyncError> {
    tokio::fs::create_dir_all(output_dir).await?;

    let writes = items
        .iter()
        .zip(contents)
        .filter_map(|(item, content)| {
            content
                .as_deref()
                .map(|content| (output_dir.join(flat_file_name(item)), content))
        })
        .map(|(path, content)| async move {
            debug!("Writing {}", path.display());
            tokio::fs::write(&path, content).await
        });

    let written = try_join_all(writes).await?;
    Ok(written.len())
}
