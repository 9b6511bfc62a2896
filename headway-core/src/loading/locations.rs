//! Locations CSV (`id,latitude,longitude`) for presets and one-to-many
//! inputs.

use std::fs::File;
use std::path::Path;

use crate::error::Error;
use crate::model::Location;

pub fn read_locations(path: &Path) -> Result<Vec<Location>, Error> {
    let file = File::open(path).map_err(|e| {
        std::io::Error::new(
            e.kind(),
            format!("Failed to open locations file '{}': {}", path.display(), e),
        )
    })?;
    let locations = csv::Reader::from_reader(file)
        .deserialize()
        .collect::<Result<Vec<Location>, csv::Error>>()?;
    Ok(locations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_id_lat_lng_rows() {
        let mut file = tempfile_path("locations.csv");
        writeln!(file.1, "id,latitude,longitude").unwrap();
        writeln!(file.1, "home,47.05,8.01").unwrap();
        writeln!(file.1, "work,47.10,8.12").unwrap();
        file.1.flush().unwrap();

        let locations = read_locations(&file.0).unwrap();
        assert_eq!(locations.len(), 2);
        assert_eq!(locations[0].id, "home");
        assert_eq!(locations[1].longitude, 8.12);
        std::fs::remove_file(&file.0).ok();
    }

    fn tempfile_path(name: &str) -> (std::path::PathBuf, File) {
        let path = std::env::temp_dir().join(format!("headway-{}-{name}", std::process::id()));
        let file = File::create(&path).unwrap();
        (path, file)
    }
}
