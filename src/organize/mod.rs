//! Sorts media files into `YYYY/YYYY-MM-DD` folders by capture date.
//!
//! Every decision is made up front by [`Organizer::plan`]; a dry run only
//! reports that plan while a live run carries it out, so both arrive at the
//! same destinations.

pub mod capture_date;
pub mod layout;

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::config::OrganizeConfig;
use crate::error::{GoProError, Result, fs_err};
use crate::sidecar;
use crate::timestamps;

use capture_date::{CaptureDate, infer_capture_date};
use layout::{DestinationAllocator, bucket_dir, file_name};

pub const MEDIA_EXTENSIONS: &[&str] = &[
    "mp4", "mov", "lrv", "360", "avi", "mkv", "jpg", "jpeg", "png", "heic", "heif", "gpr", "dng",
    "tif", "tiff", "webp",
];

/// A candidate media file and what is known about it.
#[derive(Debug, Clone)]
pub struct LocalFile {
    pub path: PathBuf,
    pub capture: CaptureDate,
    /// Sidecar file names found next to `path`.
    pub companions: Vec<String>,
}

impl LocalFile {
    pub fn inspect(path: &Path) -> Result<LocalFile> {
        let capture = infer_capture_date(path)?;
        let (stem, extension) = split_name(path);
        let companions = sidecar::companion_names(&stem, extension.as_deref())
            .into_iter()
            .filter(|name| path.with_file_name(name).is_file())
            .collect();

        Ok(LocalFile {
            path: path.to_path_buf(),
            capture,
            companions,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedAction {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub companions: Vec<(PathBuf, PathBuf)>,
    pub capture: CaptureDate,
}

#[derive(Debug, Default)]
pub struct OrganizePlan {
    pub actions: Vec<PlannedAction>,
    /// Files already sitting in their date folder, or whose identical copy
    /// already does.
    pub in_place: Vec<PathBuf>,
    pub failures: Vec<(PathBuf, GoProError)>,
}

#[derive(Debug, Default)]
pub struct OrganizeSummary {
    /// `(source, destination)` of every primary file moved, copied or, in a
    /// dry run, reported.
    pub performed: Vec<(PathBuf, PathBuf)>,
    pub in_place: usize,
    pub failed: usize,
}

impl OrganizeSummary {
    pub fn processed(&self) -> usize {
        self.performed.len()
    }
}

pub struct Organizer {
    config: OrganizeConfig,
}

impl Organizer {
    pub fn new(config: OrganizeConfig) -> Result<Organizer> {
        if !config.target_dir.is_dir() {
            return Err(GoProError::fs(
                &config.target_dir,
                io::Error::new(io::ErrorKind::NotFound, "directory not found"),
            ));
        }
        Ok(Organizer { config })
    }

    pub fn config(&self) -> &OrganizeConfig {
        &self.config
    }

    /// Media files under the target directory, in name order.
    pub fn candidates(&self) -> impl Iterator<Item = PathBuf> + '_ {
        let max_depth = if self.config.recursive { usize::MAX } else { 1 };
        WalkDir::new(&self.config.target_dir)
            .min_depth(1)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(e) => Some(e),
                Err(err) => {
                    match err.path() {
                        Some(path) => warn!("Failed to access {}: {err}", path.display()),
                        None => warn!("Directory walk error: {err}"),
                    }
                    None
                }
            })
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|path| is_media_file(path))
    }

    pub fn plan(&self) -> OrganizePlan {
        let mut plan = OrganizePlan::default();
        let mut allocator = DestinationAllocator::new();

        for path in self.candidates() {
            let file = match LocalFile::inspect(&path) {
                Ok(f) => f,
                Err(e) => {
                    plan.failures.push((path, e));
                    continue;
                }
            };

            let dir = bucket_dir(&self.config.target_dir, file.capture.date);
            if file.path.parent() == Some(dir.as_path()) {
                debug!("{} is already organized", file.path.display());
                plan.in_place.push(file.path);
                continue;
            }

            let (stem, extension) = split_name(&file.path);
            let placed = dir.join(file_name(&stem, extension.as_deref()));
            match same_contents(&file.path, &placed) {
                Ok(true) => {
                    debug!(
                        "{} is already organized as {}",
                        file.path.display(),
                        placed.display()
                    );
                    plan.in_place.push(file.path);
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    plan.failures.push((file.path, e));
                    continue;
                }
            }

            let allocated =
                allocator.allocate(&dir, &stem, extension.as_deref(), &file.companions);
            let new_stem = match allocated {
                Ok(s) => s,
                Err(e) => {
                    plan.failures.push((file.path, e));
                    continue;
                }
            };

            let companions = file
                .companions
                .iter()
                .map(|name| {
                    (
                        file.path.with_file_name(name),
                        dir.join(sidecar::rename_companion(name, &stem, &new_stem)),
                    )
                })
                .collect();

            plan.actions.push(PlannedAction {
                destination: dir.join(file_name(&new_stem, extension.as_deref())),
                source: file.path,
                companions,
                capture: file.capture,
            });
        }

        plan
    }

    /// Plans and then performs (or, in a dry run, reports) every action.
    pub fn run(&self) -> OrganizeSummary {
        let plan = self.plan();
        self.execute(plan)
    }

    pub fn execute(&self, plan: OrganizePlan) -> OrganizeSummary {
        let mut summary = OrganizeSummary {
            in_place: plan.in_place.len(),
            ..OrganizeSummary::default()
        };

        for (path, e) in plan.failures {
            error!("Error processing {}: {e}", path.display());
            summary.failed += 1;
        }

        for action in plan.actions {
            match self.apply(&action) {
                Ok(()) => summary.performed.push((action.source, action.destination)),
                Err(e) => {
                    error!("Error processing {}: {e}", action.source.display());
                    summary.failed += 1;
                }
            }
        }

        summary
    }

    fn apply(&self, action: &PlannedAction) -> Result<()> {
        let verb = match (self.config.dry_run, self.config.copy_mode) {
            (true, true) => "Would copy",
            (true, false) => "Would move",
            (false, true) => "Copying",
            (false, false) => "Moving",
        };
        info!(
            "{verb} {} to {} ({} from {})",
            action.source.display(),
            action.destination.display(),
            action.capture.date.format("%Y-%m-%d"),
            action.capture.source
        );
        for (source, destination) in &action.companions {
            debug!("{verb} {} to {}", source.display(), destination.display());
        }

        if self.config.dry_run {
            return Ok(());
        }

        if let Some(parent) = action.destination.parent() {
            fs::create_dir_all(parent).map_err(fs_err(parent))?;
        }

        let group = std::iter::once((action.source.as_path(), action.destination.as_path()))
            .chain(
                action
                    .companions
                    .iter()
                    .map(|(s, d)| (s.as_path(), d.as_path())),
            );
        let mut done: Vec<(&Path, &Path)> = Vec::new();
        for (source, destination) in group {
            if let Err(e) = self.transfer(source, destination) {
                self.roll_back(&done);
                return Err(e);
            }
            done.push((source, destination));
        }

        if self.config.set_file_times {
            timestamps::set_capture_times(&action.destination, action.capture.date)?;
        }
        Ok(())
    }

    fn transfer(&self, source: &Path, destination: &Path) -> Result<()> {
        if self.config.copy_mode {
            fs::copy(source, destination).map_err(fs_err(destination))?;
            return Ok(());
        }
        move_file(source, destination)
    }

    /// Undoes the transfers of a group that could not be completed, so a
    /// media file never ends up separated from its sidecars.
    fn roll_back(&self, done: &[(&Path, &Path)]) {
        for (source, destination) in done.iter().rev() {
            let undone = if self.config.copy_mode {
                fs::remove_file(destination).map_err(fs_err(destination))
            } else {
                move_file(destination, source)
            };
            if let Err(e) = undone {
                warn!("Failed to roll back {}: {e}", destination.display());
            }
        }
    }
}

/// Renames, or copies and then deletes when the rename cannot cross devices.
fn move_file(source: &Path, destination: &Path) -> Result<()> {
    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            fs::copy(source, destination).map_err(fs_err(destination))?;
            if let Err(e) = fs::remove_file(source) {
                let _ = fs::remove_file(destination);
                return Err(GoProError::fs(source, e));
            }
            Ok(())
        }
        Err(e) => Err(GoProError::fs(source, e)),
    }
}

/// True when `existing` is a file with exactly the bytes of `source`.
fn same_contents(source: &Path, existing: &Path) -> Result<bool> {
    if !existing.is_file() {
        return Ok(false);
    }
    let length = fs::metadata(source).map_err(fs_err(source))?.len();
    if fs::metadata(existing).map_err(fs_err(existing))?.len() != length {
        return Ok(false);
    }

    let mut a = BufReader::new(File::open(source).map_err(fs_err(source))?);
    let mut b = BufReader::new(File::open(existing).map_err(fs_err(existing))?);
    let mut buf_a = [0u8; 8192];
    let mut buf_b = [0u8; 8192];
    let mut remaining = length;
    while remaining > 0 {
        let n = remaining.min(buf_a.len() as u64) as usize;
        a.read_exact(&mut buf_a[..n]).map_err(fs_err(source))?;
        b.read_exact(&mut buf_b[..n]).map_err(fs_err(existing))?;
        if buf_a[..n] != buf_b[..n] {
            return Ok(false);
        }
        remaining -= n as u64;
    }
    Ok(true)
}

fn is_media_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if name.starts_with("._") || sidecar::is_companion(name) {
        return false;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| MEDIA_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

fn split_name(path: &Path) -> (String, Option<String>) {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().into_owned());
    (stem, extension)
}
