//! Binary guide table files.
//!
//! Layout, native endian: six `f32` (min xyz, max xyz of the expanded scene
//! box), then until end of file one record per cell:
//! `i32` cell index, `f32` weight per bin, `i32` visit count per bin.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use rlt_math::{Aabb, Vec3};

use crate::error::{GuideError, GuideResult};

const HEADER_BYTES: usize = 6 * 4;

/// One cell of a guide table file.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRecord {
    pub cell: u32,
    pub weights: Vec<f32>,
    pub visits: Vec<u32>,
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> GuideError + '_ {
    move |source| GuideError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Write `records` (expected in ascending cell order) after the bounds header.
pub fn write_table<'a>(
    path: &Path,
    bounds: &Aabb,
    records: impl IntoIterator<Item = &'a TableRecord>,
) -> GuideResult<usize> {
    let file = File::create(path).map_err(io_error(path))?;
    let mut out = BufWriter::new(file);

    let header: [f32; 6] = [
        bounds.min.x,
        bounds.min.y,
        bounds.min.z,
        bounds.max.x,
        bounds.max.y,
        bounds.max.z,
    ];
    out.write_all(bytemuck::bytes_of(&header))
        .map_err(io_error(path))?;

    let mut count = 0;
    for record in records {
        let cell = record.cell as i32;
        let visits: Vec<i32> = record
            .visits
            .iter()
            .map(|&v| v.min(i32::MAX as u32) as i32)
            .collect();
        out.write_all(bytemuck::bytes_of(&cell))
            .and_then(|_| out.write_all(bytemuck::cast_slice(&record.weights)))
            .and_then(|_| out.write_all(bytemuck::cast_slice(&visits)))
            .map_err(io_error(path))?;
        count += 1;
    }
    out.flush().map_err(io_error(path))?;

    log::info!("Guide table: wrote {} cells to {}", count, path.display());
    Ok(count)
}

/// Read a table with `bins` bins per cell.
pub fn read_table(path: &Path, bins: usize) -> GuideResult<(Aabb, Vec<TableRecord>)> {
    let mut bytes = Vec::new();
    File::open(path)
        .and_then(|mut f| f.read_to_end(&mut bytes))
        .map_err(io_error(path))?;

    let corrupt = |reason: String| GuideError::CorruptTable {
        path: path.to_path_buf(),
        reason,
    };

    if bytes.len() < HEADER_BYTES {
        return Err(corrupt(format!(
            "{} bytes is too short for the header",
            bytes.len()
        )));
    }
    let header: [f32; 6] = bytemuck::pod_read_unaligned(&bytes[..HEADER_BYTES]);
    if header.iter().any(|v| !v.is_finite()) {
        return Err(corrupt("non-finite scene bounds".to_string()));
    }
    let bounds = Aabb::new(
        Vec3::new(header[0], header[1], header[2]),
        Vec3::new(header[3], header[4], header[5]),
    );

    let body = &bytes[HEADER_BYTES..];
    let record_bytes = 4 + bins * 8;
    if body.len() % record_bytes != 0 {
        return Err(corrupt(format!(
            "{} trailing bytes do not form a record of {} bins",
            body.len() % record_bytes,
            bins
        )));
    }

    let mut records = Vec::with_capacity(body.len() / record_bytes);
    for chunk in body.chunks_exact(record_bytes) {
        let cell: i32 = bytemuck::pod_read_unaligned(&chunk[..4]);
        let (weight_bytes, visit_bytes) = chunk[4..].split_at(bins * 4);
        let weights: Vec<f32> = weight_bytes
            .chunks_exact(4)
            .map(bytemuck::pod_read_unaligned::<f32>)
            .collect();
        let visits: Vec<i32> = visit_bytes
            .chunks_exact(4)
            .map(bytemuck::pod_read_unaligned::<i32>)
            .collect();

        if cell < 0 {
            return Err(corrupt(format!("negative cell index {}", cell)));
        }
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(corrupt(format!("invalid weight in cell {}", cell)));
        }
        records.push(TableRecord {
            cell: cell as u32,
            weights,
            visits: visits.into_iter().map(|v| v.max(0) as u32).collect(),
        });
    }

    log::info!(
        "Guide table: read {} cells from {}",
        records.len(),
        path.display()
    );
    Ok((bounds, records))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("rlt_guide_{}_{}.qtable", name, std::process::id()))
    }

    #[test]
    fn test_round_trip() {
        let path = temp_path("persist_round_trip");
        let bounds = Aabb::new(Vec3::new(-1.0, 0.0, 2.0), Vec3::new(3.0, 4.0, 5.0));
        let records = vec![
            TableRecord {
                cell: 3,
                weights: vec![0.1, 0.5, 2.0, 7.25],
                visits: vec![0, 1, 2, 3],
            },
            TableRecord {
                cell: 12,
                weights: vec![1.0; 4],
                visits: vec![9; 4],
            },
        ];

        assert_eq!(write_table(&path, &bounds, &records).unwrap(), 2);
        let (read_bounds, read_records) = read_table(&path, 4).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(read_bounds, bounds);
        assert_eq!(read_records, records);
    }

    #[test]
    fn test_file_size() {
        let path = temp_path("persist_size");
        let record = TableRecord {
            cell: 0,
            weights: vec![1.0; 64],
            visits: vec![0; 64],
        };
        write_table(&path, &Aabb::new(Vec3::ZERO, Vec3::ONE), [&record]).unwrap();
        let len = std::fs::metadata(&path).unwrap().len();
        std::fs::remove_file(&path).ok();

        assert_eq!(len, 24 + 4 + 64 * 4 + 64 * 4);
    }

    #[test]
    fn test_truncated_record() {
        let path = temp_path("persist_truncated");
        let record = TableRecord {
            cell: 1,
            weights: vec![1.0; 4],
            visits: vec![0; 4],
        };
        write_table(&path, &Aabb::new(Vec3::ZERO, Vec3::ONE), [&record]).unwrap();
        let mut bytes = std::fs::read(&path).unwrap();
        bytes.truncate(bytes.len() - 3);
        std::fs::write(&path, &bytes).unwrap();

        let err = read_table(&path, 4).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, GuideError::CorruptTable { .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = read_table(Path::new("/nonexistent/dir/table.qtable"), 4).unwrap_err();
        assert!(matches!(err, GuideError::Io { .. }));
    }
}
