use crate::dataset::{
    Dataset, Sample, CALIBRATED_TIME_COLUMN, CYCLE_COLUMN, LENGTH_BASELINE_COLUMN,
    LENGTH_COLUMN, START_TIME_COLUMN, TIME_COLUMN, WIDTH_BASELINE_COLUMN, WIDTH_COLUMN,
};
use crate::error::{Result, StrainError};
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Read a recording table with `Time (s)`, `RRWidth` and `RRLength` columns.
///
/// Extra columns are ignored; derived columns are recomputed by the stages.
pub fn read_dataset(path: &Path) -> Result<Dataset> {
    let file = File::open(path)?;
    read_dataset_from_reader(file)
}

pub fn read_dataset_from_reader<R: Read>(reader: R) -> Result<Dataset> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);
    let headers = reader.headers()?.clone();
    let time_idx = locate_column(&headers, TIME_COLUMN)?;
    let width_idx = locate_column(&headers, WIDTH_COLUMN)?;
    let length_idx = locate_column(&headers, LENGTH_COLUMN)?;

    let mut samples = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let record = result?;
        let time = parse_field(&record, time_idx, TIME_COLUMN, row)?;
        let width = parse_field(&record, width_idx, WIDTH_COLUMN, row)?;
        let length = parse_field(&record, length_idx, LENGTH_COLUMN, row)?;
        samples.push(Sample::new(time, width, length));
    }
    Dataset::new(samples)
}

/// Write the dataset with every derived column; unset values are left blank.
pub fn write_dataset(path: &Path, dataset: &Dataset) -> Result<()> {
    let file = File::create(path)?;
    write_dataset_to_writer(file, dataset)
}

pub fn write_dataset_to_writer<W: Write>(writer: W, dataset: &Dataset) -> Result<()> {
    let mut writer = WriterBuilder::new().from_writer(writer);
    writer.write_record([
        TIME_COLUMN,
        WIDTH_COLUMN,
        LENGTH_COLUMN,
        CYCLE_COLUMN,
        START_TIME_COLUMN,
        WIDTH_BASELINE_COLUMN,
        LENGTH_BASELINE_COLUMN,
        CALIBRATED_TIME_COLUMN,
    ])?;
    for s in dataset.samples() {
        writer.write_record([
            s.time.to_string(),
            s.width.to_string(),
            s.length.to_string(),
            s.cycle_id.to_string(),
            optional(s.cycle_start_time),
            optional(s.width_baseline),
            optional(s.length_baseline),
            optional(s.relative_time()),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn locate_column(headers: &StringRecord, requested: &str) -> Result<usize> {
    headers
        .iter()
        .position(|name| name.eq_ignore_ascii_case(requested))
        .ok_or_else(|| StrainError::MissingColumn(requested.to_string()))
}

fn parse_field(record: &StringRecord, idx: usize, column: &str, row: usize) -> Result<f64> {
    let raw = record.get(idx).unwrap_or("");
    if raw.is_empty() {
        return Err(StrainError::MalformedInput(format!(
            "row {}: missing {column}",
            row + 1
        )));
    }
    raw.parse::<f64>().map_err(|_| {
        StrainError::MalformedInput(format!("row {}: {column} is not numeric: {raw}", row + 1))
    })
}

#[cfg(feature = "polars")]
pub mod polars_io {
    use crate::dataset::{
        Dataset, CALIBRATED_TIME_COLUMN, CYCLE_COLUMN, LENGTH_BASELINE_COLUMN, LENGTH_COLUMN,
        START_TIME_COLUMN, TIME_COLUMN, WIDTH_BASELINE_COLUMN, WIDTH_COLUMN,
    };
    use crate::error::{Result, StrainError};
    use polars::prelude::*;
    use std::path::Path;

    /// Load a recording through polars' CSV reader.
    pub fn load_dataset(path: &Path) -> Result<Dataset> {
        let df = CsvReadOptions::default()
            .try_into_reader_with_file_path(Some(path.into()))?
            .finish()?;
        let time = load_column(&df, TIME_COLUMN)?;
        let width = load_column(&df, WIDTH_COLUMN)?;
        let length = load_column(&df, LENGTH_COLUMN)?;
        Dataset::from_columns(&time, &width, &length)
    }

    fn load_column(df: &DataFrame, col: &str) -> Result<Vec<f64>> {
        let series = df
            .column(col)
            .map_err(|_| StrainError::MissingColumn(col.to_string()))?
            .cast(&DataType::Float64)?;
        let values = series.f64()?;
        if values.null_count() > 0 {
            return Err(StrainError::MalformedInput(format!(
                "{col} has {} missing values",
                values.null_count()
            )));
        }
        Ok(values.into_no_null_iter().collect())
    }

    /// Dataset as a polars frame with the derived columns attached.
    pub fn to_dataframe(dataset: &Dataset) -> Result<DataFrame> {
        let samples = dataset.samples();
        let column = |name: &str, f: &dyn Fn(&crate::dataset::Sample) -> Option<f64>| {
            Series::new(name.into(), samples.iter().map(f).collect::<Vec<_>>())
        };
        let df = DataFrame::new(vec![
            Series::new(
                TIME_COLUMN.into(),
                samples.iter().map(|s| s.time).collect::<Vec<_>>(),
            ),
            Series::new(
                WIDTH_COLUMN.into(),
                samples.iter().map(|s| s.width).collect::<Vec<_>>(),
            ),
            Series::new(
                LENGTH_COLUMN.into(),
                samples.iter().map(|s| s.length).collect::<Vec<_>>(),
            ),
            Series::new(
                CYCLE_COLUMN.into(),
                samples.iter().map(|s| s.cycle_id as i64).collect::<Vec<_>>(),
            ),
            column(START_TIME_COLUMN, &|s| s.cycle_start_time),
            column(WIDTH_BASELINE_COLUMN, &|s| s.width_baseline),
            column(LENGTH_BASELINE_COLUMN, &|s| s.length_baseline),
            column(CALIBRATED_TIME_COLUMN, &|s| s.relative_time()),
        ])?;
        Ok(df)
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::cycles::{label_cycle, normalize_start_time};

        const TABLE: &str = "Time (s),RRWidth,RRLength,Note\n\
                             0.0,10.0,20.0,a\n\
                             0.1,11.0,21.0,b\n\
                             0.2,12.0,22.0,c\n";

        fn write_table(dir: &tempfile::TempDir, text: &str) -> std::path::PathBuf {
            let path = dir.path().join("recording.csv");
            std::fs::write(&path, text).unwrap();
            path
        }

        #[test]
        fn loads_recording_and_exports_frame() {
            let dir = tempfile::tempdir().unwrap();
            let mut ds = load_dataset(&write_table(&dir, TABLE)).unwrap();
            assert_eq!(ds.len(), 3);
            assert_eq!(ds.samples()[1].width, 11.0);
            assert_eq!(ds.samples()[2].length, 22.0);

            label_cycle(&mut ds, 1, 0.05, 0.2).unwrap();
            normalize_start_time(&mut ds, 1).unwrap();
            let df = to_dataframe(&ds).unwrap();

            let names: Vec<String> = df
                .get_column_names()
                .iter()
                .map(|n| n.to_string())
                .collect();
            assert_eq!(
                names,
                [
                    TIME_COLUMN,
                    WIDTH_COLUMN,
                    LENGTH_COLUMN,
                    CYCLE_COLUMN,
                    START_TIME_COLUMN,
                    WIDTH_BASELINE_COLUMN,
                    LENGTH_BASELINE_COLUMN,
                    CALIBRATED_TIME_COLUMN,
                ]
            );
            assert_eq!(df.height(), 3);
            assert_eq!(df.column(TIME_COLUMN).unwrap().null_count(), 0);
            // the first row lies before the labeled window
            assert_eq!(df.column(START_TIME_COLUMN).unwrap().null_count(), 1);
            assert_eq!(df.column(CALIBRATED_TIME_COLUMN).unwrap().null_count(), 1);
            // no baseline was computed
            assert_eq!(df.column(WIDTH_BASELINE_COLUMN).unwrap().null_count(), 3);
            assert_eq!(df.column(LENGTH_BASELINE_COLUMN).unwrap().null_count(), 3);
            let cycle = df.column(CYCLE_COLUMN).unwrap().i64().unwrap();
            assert_eq!(cycle.get(0), Some(0));
            assert_eq!(cycle.get(2), Some(1));
        }

        #[test]
        fn missing_column_is_reported() {
            let dir = tempfile::tempdir().unwrap();
            let path = write_table(&dir, "Time (s),RRWidth\n0.0,1.0\n0.1,2.0\n");
            let err = load_dataset(&path).unwrap_err();
            assert!(matches!(err, StrainError::MissingColumn(ref c) if c == LENGTH_COLUMN));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cycles::{label_cycle, normalize_start_time};

    const TABLE: &str = "Time (s),RRWidth,RRLength,Note\n\
                         0.0, 10.0, 20.0, a\n\
                         0.1, 11.0, 21.0, b\n\
                         0.2, 12.0, 22.0, c\n";

    #[test]
    fn reads_named_columns() {
        let ds = read_dataset_from_reader(TABLE.as_bytes()).unwrap();
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.samples()[1].width, 11.0);
        assert_eq!(ds.samples()[2].length, 22.0);
    }

    #[test]
    fn missing_column_is_reported() {
        let err = read_dataset_from_reader("Time (s),RRWidth\n0.0,1.0\n".as_bytes()).unwrap_err();
        assert!(matches!(err, StrainError::MissingColumn(ref c) if c == LENGTH_COLUMN));
    }

    #[test]
    fn blank_time_is_malformed() {
        let text = "Time (s),RRWidth,RRLength\n0.0,1,1\n,1,1\n";
        let err = read_dataset_from_reader(text.as_bytes()).unwrap_err();
        assert!(matches!(err, StrainError::MalformedInput(_)));
    }

    #[test]
    fn writes_derived_columns() {
        let mut ds = read_dataset_from_reader(TABLE.as_bytes()).unwrap();
        label_cycle(&mut ds, 1, 0.05, 0.2).unwrap();
        normalize_start_time(&mut ds, 1).unwrap();
        let mut out = Vec::new();
        write_dataset_to_writer(&mut out, &ds).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "Time (s),RRWidth,RRLength,Cycle,Start time (s),width_baseline,length_baseline,Calibrate time (s)"
        );
        assert_eq!(lines[1], "0,10,20,0,,,,");
        assert!(lines[2].starts_with("0.1,11,21,1,0.1,,,0"));
    }

    #[test]
    fn round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let ds = read_dataset_from_reader(TABLE.as_bytes()).unwrap();
        write_dataset(&path, &ds).unwrap();
        let back = read_dataset(&path).unwrap();
        assert_eq!(back.samples(), ds.samples());
    }
}
