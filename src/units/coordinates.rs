use std::path::Path;

use diesel::prelude::*;
use log::info;
use serde::Deserialize;

use crate::records;
use crate::schema::{unit_coordinates, unit_distances};
use crate::stage::{Processed, StageError, StageLoader};
use crate::status::Stage;
use crate::toolkit::Toolkit;
use crate::units::check_unit;
use crate::units::models::{UnitCoordinates, UnitDistance};

pub const COORDINATE_COLUMNS: [&str; 2] = ["unit_id", "coordinates"];
pub const DISTANCE_COLUMNS: [&str; 3] = ["unit_id_1", "unit_id_2", "distance"];

#[derive(Debug, Deserialize)]
struct CoordinateRow {
    unit_id: String,
    coordinates: String,
}

#[derive(Debug, Deserialize)]
struct DistanceRow {
    unit_id_1: String,
    unit_id_2: String,
    distance: f64,
}

/// Unit coordinates and the center distances between neighbouring units.
/// One toolkit call writes both files.
pub struct DistancesAndCoordinatesLoader<'a, T: Toolkit> {
    toolkit: &'a T,
}

impl<'a, T: Toolkit> DistancesAndCoordinatesLoader<'a, T> {
    pub fn new(toolkit: &'a T) -> Self {
        Self { toolkit }
    }
}

impl<'a, T: Toolkit> StageLoader for DistancesAndCoordinatesLoader<'a, T> {
    fn stage(&self) -> Stage {
        Stage::Coordinates
    }

    fn delete_existing(
        &self,
        connection: &mut SqliteConnection,
        pdb_id: &str,
    ) -> Result<usize, StageError> {
        let pdb = pdb_id.to_uppercase();
        let coordinates =
            diesel::delete(unit_coordinates::table.filter(unit_coordinates::pdb_id.eq(&pdb)))
                .execute(connection)?;
        let distances =
            diesel::delete(unit_distances::table.filter(unit_distances::pdb_id.eq(&pdb)))
                .execute(connection)?;
        Ok(coordinates + distances)
    }

    fn process(
        &self,
        connection: &mut SqliteConnection,
        pdb_id: &str,
        work_dir: &Path,
    ) -> Result<Processed, StageError> {
        let coordinates_file = work_dir.join(format!("{}_coordinates.csv", pdb_id));
        let distances_file = work_dir.join(format!("{}_distances.csv", pdb_id));
        self.toolkit
            .call(
                "unitCoordinates",
                &[
                    pdb_id.to_string(),
                    coordinates_file.to_string_lossy().to_string(),
                    distances_file.to_string_lossy().to_string(),
                ],
            )
            .map_err(|err| StageError::toolkit(pdb_id, err))?;

        let pdb = pdb_id.to_uppercase();
        let coordinates: Vec<CoordinateRow> =
            records::read_records_from_path(&coordinates_file, &COORDINATE_COLUMNS)?;
        let distances: Vec<DistanceRow> =
            records::read_records_from_path(&distances_file, &DISTANCE_COLUMNS)?;

        for row in coordinates.iter() {
            check_unit(&row.unit_id, pdb_id)?;
            let unit = UnitCoordinates {
                unit_id: row.unit_id.clone(),
                pdb_id: pdb.clone(),
                coordinates: row.coordinates.clone(),
            };
            diesel::insert_into(unit_coordinates::table)
                .values(&unit)
                .on_conflict(unit_coordinates::unit_id)
                .do_update()
                .set(&unit)
                .execute(connection)?;
        }

        for (index, row) in distances.iter().enumerate() {
            if index % 1000 == 0 {
                info!("Inserted {0}/{1}", index, distances.len());
            }
            check_unit(&row.unit_id_1, pdb_id)?;
            check_unit(&row.unit_id_2, pdb_id)?;
            if row.distance < 0.0 {
                return Err(StageError::Invalid(format!(
                    "Negative distance between {} and {}",
                    row.unit_id_1, row.unit_id_2
                )));
            }

            let distance = UnitDistance {
                unit_id_1: row.unit_id_1.clone(),
                unit_id_2: row.unit_id_2.clone(),
                pdb_id: pdb.clone(),
                distance: row.distance,
            };
            diesel::insert_into(unit_distances::table)
                .values(&distance)
                .on_conflict((unit_distances::unit_id_1, unit_distances::unit_id_2))
                .do_update()
                .set(&distance)
                .execute(connection)?;
        }

        Ok(Processed { rows: coordinates.len() + distances.len() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_connection;
    use crate::stage::run_stage;
    use crate::toolkit::ToolkitError;
    use std::fs;

    struct CannedToolkit {
        coordinates: &'static str,
        distances: &'static str,
    }

    impl Toolkit for CannedToolkit {
        fn call(&self, _function: &str, args: &[String]) -> Result<(), ToolkitError> {
            fs::write(&args[1], self.coordinates).unwrap();
            fs::write(&args[2], self.distances).unwrap();
            Ok(())
        }
    }

    #[test]
    fn stores_both_files_and_removes_them() {
        let dir = tempfile::tempdir().unwrap();
        let mut conn = test_connection();
        let toolkit = CannedToolkit {
            coordinates: "unit_id,coordinates\n\
                          1S72|1|0|G|5,\"ATOM 1 P G 0 5\"\n\
                          1S72|1|0|A|6,\"ATOM 2 P A 0 6\"\n",
            distances: "unit_id_1,unit_id_2,distance\n1S72|1|0|G|5,1S72|1|0|A|6,5.8\n",
        };
        let loader = DistancesAndCoordinatesLoader::new(&toolkit);

        let summary = run_stage(&loader, &mut conn, &["1s72".to_string()], false, dir.path()).unwrap();
        assert_eq!(summary.rows, 3);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);

        let stored: UnitDistance = unit_distances::table
            .select(UnitDistance::as_select())
            .first(&mut conn)
            .unwrap();
        assert_eq!(stored.pdb_id, "1S72");
        assert_eq!(stored.distance, 5.8);

        assert_eq!(loader.delete_existing(&mut conn, "1S72").unwrap(), 3);
    }

    #[test]
    fn a_bad_distances_file_rolls_back_coordinates() {
        let dir = tempfile::tempdir().unwrap();
        let mut conn = test_connection();
        let toolkit = CannedToolkit {
            coordinates: "unit_id,coordinates\n1S72|1|0|G|5,\"ATOM\"\n",
            distances: "unit_id_1,unit_id_2\n1S72|1|0|G|5,1S72|1|0|A|6\n",
        };
        let loader = DistancesAndCoordinatesLoader::new(&toolkit);

        assert!(run_stage(&loader, &mut conn, &["1S72".to_string()], false, dir.path()).is_err());
        let count: i64 = unit_coordinates::table.count().get_result(&mut conn).unwrap();
        assert_eq!(count, 0);
    }
}
