use string_weave::Target;

/// White canvas crossed by a dark horizontal band through the middle.
pub fn banded_target(radius: usize, band: usize) -> Target {
    let side = 2 * radius;
    let pixels = (0..side * side)
        .map(|index| {
            let y = index / side;
            if y.abs_diff(radius) < band {
                0
            } else {
                255
            }
        })
        .collect();
    Target::from_raw(radius, pixels).expect("pixel count matches the radius")
}

pub fn scratch_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("string_weave_{name}_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}
