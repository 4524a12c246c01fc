//! Store an uploaded dataset under the datasets root.

use std::io::Read;
use std::path::{Component, Path, PathBuf};

use crate::error::{ServiceError, ServiceResult};
use crate::store::write_atomic;

/// Copy `reader` into `<datasets_dir>/<file_name>` and return the stored path.
///
/// Only plain `*.csv` file names are accepted; an existing file of the same name is
/// replaced atomically.
pub fn import_dataset(
    datasets_dir: &Path,
    file_name: &str,
    mut reader: impl Read,
) -> ServiceResult<PathBuf> {
    let file_name = validate_file_name(file_name)?;
    let dest = datasets_dir.join(file_name);
    let mut copied = 0u64;
    write_atomic(&dest, |file| {
        copied = std::io::copy(&mut reader, file)?;
        Ok(())
    })?;
    tracing::info!("Imported dataset {} ({copied} bytes)", dest.display());
    Ok(dest)
}

fn validate_file_name(file_name: &str) -> ServiceResult<&str> {
    let mut components = Path::new(file_name).components();
    let is_plain = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !file_name.contains(['/', '\\']);
    if !is_plain {
        return Err(ServiceError::InvalidInput(format!(
            "Invalid dataset file name: {file_name}"
        )));
    }
    let is_csv = Path::new(file_name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if !is_csv {
        return Err(ServiceError::InvalidInput(
            "Only CSV files are supported.".to_string(),
        ));
    }
    Ok(file_name)
}
