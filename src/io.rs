/**
 * HyperReco
 * Copyright (C) 2018 Sebastian Schelter
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <http://www.gnu.org/licenses/>.
 */

use std::fs::File;
use std::io::prelude::*;
use std::io::{stdout, BufReader, BufWriter};
use std::path::Path;

use tracing::info;

use crate::error::{Error, Result};
use crate::model::Parameters;
use crate::sparse;
use crate::types::{Dimensions, RawRelations, Relation};

pub const DATA_SIZE_FILE: &str = "data_size.txt";
pub const USER_ITEM_FILE: &str = "user_item.txt";
pub const BUNDLE_ITEM_FILE: &str = "bundle_item.txt";
pub const USER_BUNDLE_FILE: &str = "user_bundle_train.txt";

/// Reads a CSV input file. We expect NO headers and tab separation.
pub fn csv_reader<P: AsRef<Path>>(file: P) -> Result<csv::Reader<File>> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(b'\t')
        .flexible(true)
        .from_path(file)?;

    Ok(reader)
}

/// Reads `num_users num_bundles num_items` from the first line of the size file.
pub fn read_dimensions<P: AsRef<Path>>(file: P) -> Result<Dimensions> {
    let path = file.as_ref().display().to_string();
    let mut reader = csv_reader(&file)?;

    let record = match reader.records().next() {
        Some(record) => record?,
        None => return Err(malformed(&path, 1, "file is empty")),
    };

    let mut sizes = [0usize; 3];
    for (position, size) in sizes.iter_mut().enumerate() {
        let field = record.get(position)
            .ok_or_else(|| malformed(&path, 1, "expected three tab separated sizes"))?;
        *size = field.trim().parse()
            .map_err(|_| malformed(&path, 1, &format!("'{}' is not a size", field)))?;
    }

    Ok(Dimensions { num_users: sizes[0], num_bundles: sizes[1], num_items: sizes[2] })
}

/// Reads one `row<TAB>column` pair per line into a relation of the given shape. Every pair
/// counts once, repeated pairs add up.
pub fn read_relation<P: AsRef<Path>>(
    file: P,
    relation: &'static str,
    rows: (&'static str, usize),
    cols: (&'static str, usize),
) -> Result<Relation> {

    let path = file.as_ref().display().to_string();
    let mut reader = csv_reader(&file)?;
    let mut triplets = Vec::new();

    for result in reader.deserialize() {
        let (row, col): (usize, usize) = result?;

        if row >= rows.1 {
            return Err(Error::DimensionMismatch { relation, dimension: rows.0, expected: rows.1, got: row + 1 });
        }
        if col >= cols.1 {
            return Err(Error::DimensionMismatch { relation, dimension: cols.0, expected: cols.1, got: col + 1 });
        }
        triplets.push((row, col, 1.0));
    }

    info!(path = %path, relation, interactions = triplets.len(), "read relation");

    sparse::from_triplets(rows.1, cols.1, &triplets)
}

/// Reads the three relations of a dataset directory.
pub fn read_dataset<P: AsRef<Path>>(directory: P) -> Result<RawRelations> {
    let directory = directory.as_ref();
    let dimensions = read_dimensions(directory.join(DATA_SIZE_FILE))?;

    let users = ("num_users", dimensions.num_users);
    let bundles = ("num_bundles", dimensions.num_bundles);
    let items = ("num_items", dimensions.num_items);

    RawRelations::new(
        read_relation(directory.join(USER_ITEM_FILE), "user_item", users, items)?,
        read_relation(directory.join(BUNDLE_ITEM_FILE), "bundle_item", bundles, items)?,
        read_relation(directory.join(USER_BUNDLE_FILE), "user_bundle", users, bundles)?,
    )
}

fn malformed(path: &str, line: u64, reason: &str) -> Error {
    Error::MalformedInput { path: path.to_owned(), line, reason: reason.to_owned() }
}

pub fn read_parameters<P: AsRef<Path>>(file: P) -> Result<Parameters> {
    let reader = BufReader::new(File::open(file)?);
    Ok(serde_json::from_reader(reader)?)
}

pub fn write_parameters<P: AsRef<Path>>(parameters: &Parameters, file: P) -> Result<()> {
    let mut writer = BufWriter::new(File::create(file)?);
    serde_json::to_writer(&mut writer, parameters)?;
    writer.flush()?;
    Ok(())
}

/// Struct used for JSON serialization of recommendations. Field names will be used in JSON.
#[derive(Serialize)]
struct Recommendations<'a> {
    user: usize,
    bundles: &'a [usize],
}

/// Output the recommended bundles per user in JSON format, one user per line. If a
/// `recommendations_path` is supplied, we write to a file at the specified path, otherwise, we
/// output to stdout.
pub fn write_recommendations(
    users: &[usize],
    recommendations: &[Vec<usize>],
    recommendations_path: Option<String>,
) -> Result<()> {

    let mut out: Box<dyn Write> = match recommendations_path {
        Some(path) => Box::new(BufWriter::new(File::create(Path::new(&path))?)),
        _ => Box::new(stdout()),
    };

    for (&user, bundles) in users.iter().zip(recommendations.iter()) {
        let recommendations_as_json = json!(Recommendations { user, bundles });
        writeln!(out, "{}", recommendations_as_json)?;
    }

    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {

    use std::env;
    use std::fs::{self, File};
    use std::io::prelude::*;
    use std::path::PathBuf;

    use crate::error::Error;
    use crate::model::Parameters;
    use crate::types::Dimensions;
    use super::*;

    fn scratch_directory(name: &str) -> PathBuf {
        let directory = env::temp_dir().join(format!("hyperreco-{}-{}", name, std::process::id()));
        fs::create_dir_all(&directory).unwrap();
        directory
    }

    fn write_file(directory: &PathBuf, name: &str, contents: &str) {
        let mut file = File::create(directory.join(name)).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
    }

    fn write_dataset(directory: &PathBuf, user_bundle: &str) {
        write_file(directory, DATA_SIZE_FILE, "2\t3\t4\n");
        write_file(directory, USER_ITEM_FILE, "0\t1\n1\t3\n1\t3\n");
        write_file(directory, BUNDLE_ITEM_FILE, "0\t0\n1\t1\n2\t2\n2\t3\n");
        write_file(directory, USER_BUNDLE_FILE, user_bundle);
    }

    #[test]
    fn reads_a_dataset() {
        let directory = scratch_directory("dataset");
        write_dataset(&directory, "0\t0\n0\t2\n1\t2\n");

        let relations = read_dataset(&directory).unwrap();
        let dimensions = relations.dimensions().unwrap();

        assert_eq!(dimensions, Dimensions { num_users: 2, num_bundles: 3, num_items: 4 });
        assert_eq!(relations.user_item.get(1, 3), Some(&2.0));
        assert_eq!(relations.bundle_item.nnz(), 4);
        assert_eq!(relations.user_bundle.get(1, 2), Some(&1.0));

        fs::remove_dir_all(&directory).unwrap();
    }

    #[test]
    fn out_of_range_ids_name_the_relation() {
        let directory = scratch_directory("out-of-range");
        write_dataset(&directory, "0\t0\n1\t3\n");

        match read_dataset(&directory) {
            Err(Error::DimensionMismatch { relation, dimension, .. }) => {
                assert_eq!(relation, "user_bundle");
                assert_eq!(dimension, "num_bundles");
            },
            other => panic!("unexpected result {:?}", other),
        }

        fs::remove_dir_all(&directory).unwrap();
    }

    #[test]
    fn malformed_size_file() {
        let directory = scratch_directory("malformed");
        write_file(&directory, DATA_SIZE_FILE, "2\tmany\n");

        assert!(read_dimensions(directory.join(DATA_SIZE_FILE)).is_err());

        fs::remove_dir_all(&directory).unwrap();
    }

    #[test]
    fn parameters_survive_the_disk() {
        let directory = scratch_directory("parameters");
        let path = directory.join("parameters.json");
        let dimensions = Dimensions { num_users: 2, num_bundles: 3, num_items: 4 };
        let parameters = Parameters::init(dimensions, 4, 1).unwrap();

        write_parameters(&parameters, &path).unwrap();
        assert_eq!(read_parameters(&path).unwrap(), parameters);

        fs::remove_dir_all(&directory).unwrap();
    }

    #[test]
    fn recommendations_as_json_lines() {
        let directory = scratch_directory("recommendations");
        let path = directory.join("recommendations.json");

        write_recommendations(
            &[0, 4],
            &[vec![2, 1], vec![]],
            Some(path.display().to_string()),
        ).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines, vec![r#"{"bundles":[2,1],"user":0}"#, r#"{"bundles":[],"user":4}"#]);

        fs::remove_dir_all(&directory).unwrap();
    }
}
