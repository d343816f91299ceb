use serde::{de::DeserializeOwned, Serialize};
use std::io::Write;
use std::path::Path;

pub fn load_data_from_csv<T: DeserializeOwned, const DELIMITER: u8>(
    file_path: &Path,
) -> Result<Vec<T>, ::csv::Error> {
    let mut reader = ::csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(DELIMITER)
        .flexible(true)
        .trim(::csv::Trim::All)
        .from_path(file_path)?;
    reader.deserialize().collect()
}

pub fn dump_data_to_writer<T: Serialize, W: Write>(data: &[T], writer: W) -> Result<(), ::csv::Error> {
    let mut writer = ::csv::Writer::from_writer(writer);
    for entry in data {
        writer.serialize(entry)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn dump_data_to_csv<T: Serialize>(data: &[T], file_path: &Path) -> Result<(), ::csv::Error> {
    dump_data_to_writer(data, std::fs::File::create(file_path)?)
}
