use std::path::Path;


/// Writes a raw sheet the way a CSV export of the foundry workbook looks.
pub(crate) fn write_sheet(path: &Path, headers: &[String], rows: &[Vec<String>]) {
    let mut writer = csv::Writer::from_path(path).unwrap();
    writer.write_record(headers).unwrap();
    for row in rows {
        writer.write_record(row).unwrap();
    }
    writer.flush().unwrap();
}

pub(crate) fn read_records(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let headers = reader
        .headers()
        .unwrap()
        .iter()
        .map(String::from)
        .collect();
    let rows = reader
        .records()
        .map(|r| r.unwrap().iter().map(String::from).collect())
        .collect();
    (headers, rows)
}

pub(crate) fn column(headers: &[String], rows: &[Vec<String>], name: &str) -> Vec<String> {
    let col = headers.iter().position(|h| h == name).unwrap();
    rows.iter().map(|r| r[col].clone()).collect()
}
