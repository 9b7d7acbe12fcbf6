use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::error::{GpxError, Result};
use crate::gpx_types::{Bounds, Route, Track, TrackSegment, Waypoint};
use crate::types::{Decimal, Latitude, Longitude};

/// Sphere radius used by [`distance`], in metres.
pub const DEFAULT_EARTH_RADIUS: f64 = 6_378_137.0;

/// Speed above which a pair of points counts as moving: 0.5 km/h in m/s.
pub const MOVING_SPEED_THRESHOLD: f64 = 0.5 / 3.6;

/// A point with a position and optional elevation and timestamp.
pub trait Positioned {
    fn latitude(&self) -> f64;
    fn longitude(&self) -> f64;
    fn elevation(&self) -> Option<f64>;
    fn timestamp(&self) -> Option<DateTime<Utc>>;
}

impl Positioned for Waypoint {
    fn latitude(&self) -> f64 {
        self.lat.value()
    }

    fn longitude(&self) -> f64 {
        self.lon.value()
    }

    fn elevation(&self) -> Option<f64> {
        self.ele.map(Decimal::value)
    }

    fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.time
    }
}

/// Great-circle distance in metres on a sphere of [`DEFAULT_EARTH_RADIUS`].
pub fn distance<P: Positioned>(p: &P, q: &P) -> f64 {
    distance_with_radius(p, q, DEFAULT_EARTH_RADIUS)
}

pub fn distance_with_radius<P: Positioned>(p: &P, q: &P, radius: f64) -> f64 {
    let phi1 = p.latitude().to_radians();
    let phi2 = q.latitude().to_radians();
    let delta_phi = (q.latitude() - p.latitude()).to_radians();
    let delta_lambda = (q.longitude() - p.longitude()).to_radians();

    let a = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    radius * c
}

/// Initial bearing from `p` towards `q`, in degrees within [0, 360).
pub fn bearing<P: Positioned>(p: &P, q: &P) -> f64 {
    let phi1 = p.latitude().to_radians();
    let phi2 = q.latitude().to_radians();
    let delta_lambda = (q.longitude() - p.longitude()).to_radians();

    let y = delta_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();
    y.atan2(x).to_degrees().rem_euclid(360.0)
}

/// Time from `p` to `q`, zero unless both carry a timestamp.
pub fn duration<P: Positioned>(p: &P, q: &P) -> TimeDelta {
    match (p.timestamp(), q.timestamp()) {
        (Some(start), Some(end)) => end.signed_duration_since(start),
        _ => TimeDelta::zero(),
    }
}

/// Speed from `p` to `q` in metres per second. A zero duration yields an
/// infinite or NaN speed.
pub fn speed<P: Positioned>(p: &P, q: &P) -> f64 {
    distance(p, q) / seconds(duration(p, q))
}

/// Elevation change from `p` to `q`, zero unless both carry an elevation.
pub fn elevation_gain<P: Positioned>(p: &P, q: &P) -> f64 {
    match (p.elevation(), q.elevation()) {
        (Some(from), Some(to)) => to - from,
        _ => 0.0,
    }
}

/// Slope from `p` to `q` in percent.
pub fn slope<P: Positioned>(p: &P, q: &P) -> f64 {
    elevation_gain(p, q) / distance(p, q) * 100.0
}

pub(crate) fn seconds(d: TimeDelta) -> f64 {
    d.num_seconds() as f64 + f64::from(d.subsec_nanos()) / 1e9
}

fn pairs<P>(points: &[P]) -> impl Iterator<Item = (&P, &P)> + '_ {
    points.windows(2).map(|w| (&w[0], &w[1]))
}

/// `(distance, seconds)` of every consecutive pair with a positive duration.
fn timed_pairs<P: Positioned>(points: &[P]) -> impl Iterator<Item = (f64, f64)> + '_ {
    pairs(points).filter_map(|(p, q)| {
        let secs = seconds(duration(p, q));
        (secs > 0.0).then(|| (distance(p, q), secs))
    })
}

fn pair_speeds<P: Positioned>(points: &[P]) -> impl Iterator<Item = f64> + '_ {
    timed_pairs(points).map(|(dist, secs)| dist / secs)
}

fn elevations<P: Positioned>(points: &[P]) -> impl Iterator<Item = f64> + '_ {
    points.iter().filter_map(Positioned::elevation)
}

fn max_of(values: impl Iterator<Item = f64>, statistic: &'static str) -> Result<f64> {
    values
        .reduce(f64::max)
        .ok_or(GpxError::EmptySequence { statistic })
}

fn min_of(values: impl Iterator<Item = f64>, statistic: &'static str) -> Result<f64> {
    values
        .reduce(f64::min)
        .ok_or(GpxError::EmptySequence { statistic })
}

fn mean_of(values: impl Iterator<Item = f64>, statistic: &'static str) -> Result<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        return Err(GpxError::EmptySequence { statistic });
    }
    Ok(sum / count as f64)
}

/// Bounding box of the points.
pub fn bounds<P: Positioned>(points: &[P]) -> Result<Bounds> {
    bounds_of(points.iter())
}

fn bounds_of<'a, P: Positioned + 'a>(mut points: impl Iterator<Item = &'a P>) -> Result<Bounds> {
    let first = points.next().ok_or(GpxError::EmptySequence {
        statistic: "bounds",
    })?;
    let init = (
        first.latitude(),
        first.longitude(),
        first.latitude(),
        first.longitude(),
    );
    let (min_lat, min_lon, max_lat, max_lon) =
        points.fold(init, |(min_lat, min_lon, max_lat, max_lon), p| {
            (
                min_lat.min(p.latitude()),
                min_lon.min(p.longitude()),
                max_lat.max(p.latitude()),
                max_lon.max(p.longitude()),
            )
        });
    Ok(Bounds {
        min_lat: Latitude::new(min_lat)?,
        min_lon: Longitude::new(min_lon)?,
        max_lat: Latitude::new(max_lat)?,
        max_lon: Longitude::new(max_lon)?,
    })
}

pub fn total_distance<P: Positioned>(points: &[P]) -> f64 {
    pairs(points).map(|(p, q)| distance(p, q)).sum()
}

/// Time from the first to the last timestamped point.
pub fn total_duration<P: Positioned>(points: &[P]) -> TimeDelta {
    let first = points.iter().find_map(Positioned::timestamp);
    let last = points.iter().rev().find_map(Positioned::timestamp);
    match (first, last) {
        (Some(start), Some(end)) => end.signed_duration_since(start),
        _ => TimeDelta::zero(),
    }
}

/// Sum of the durations of consecutive pairs moving faster than
/// [`MOVING_SPEED_THRESHOLD`].
pub fn moving_duration<P: Positioned>(points: &[P]) -> TimeDelta {
    pairs(points)
        .map(|(p, q)| (duration(p, q), distance(p, q)))
        .filter(|(d, dist)| {
            let secs = seconds(*d);
            secs > 0.0 && dist / secs > MOVING_SPEED_THRESHOLD
        })
        .fold(TimeDelta::zero(), |acc, (d, _)| acc + d)
}

fn moving_distance<P: Positioned>(points: &[P]) -> f64 {
    timed_pairs(points)
        .filter(|(dist, secs)| dist / secs > MOVING_SPEED_THRESHOLD)
        .map(|(dist, _)| dist)
        .sum()
}

/// `(total ascent, total descent)` between consecutive points that carry an
/// elevation. Descent is reported as a positive magnitude.
pub fn ascent_descent<P: Positioned>(points: &[P]) -> (f64, f64) {
    let eles: Vec<f64> = elevations(points).collect();
    eles.windows(2)
        .map(|w| w[1] - w[0])
        .fold((0.0, 0.0), |(up, down), delta| {
            if delta > 0.0 {
                (up + delta, down)
            } else {
                (up, down - delta)
            }
        })
}

/// `(timestamp, speed)` for each consecutive pair with a positive duration,
/// stamped with the later point's time.
pub fn speed_profile<P: Positioned>(
    points: &[P],
) -> impl Iterator<Item = (DateTime<Utc>, f64)> + Clone + '_ {
    points.windows(2).filter_map(|w| {
        let secs = seconds(duration(&w[0], &w[1]));
        if secs > 0.0 {
            Some((w[1].timestamp()?, distance(&w[0], &w[1]) / secs))
        } else {
            None
        }
    })
}

/// `(cumulative distance, elevation)` over the points that carry an
/// elevation. Distance is measured from the previous elevation-bearing point
/// of the same run; a new run keeps the running total but adds no distance
/// for the gap.
pub fn elevation_profile<'a, P, I>(runs: I) -> impl Iterator<Item = (f64, f64)> + Clone + 'a
where
    P: Positioned + 'a,
    I: Iterator<Item = &'a [P]> + Clone + 'a,
{
    runs.flat_map(|points| {
        points
            .iter()
            .filter(|p| p.elevation().is_some())
            .enumerate()
    })
    .scan(
        (None::<&'a P>, 0.0_f64),
        |(previous, total), (index, point)| {
            if index == 0 {
                *previous = None;
            }
            if let Some(prev) = previous {
                *total += distance(*prev, point);
            }
            *previous = Some(point);
            point.elevation().map(|ele| (*total, ele))
        },
    )
}

/// Statistics shared by every ordered run of points: route points and track
/// segment points.
pub trait PointSequence {
    fn points(&self) -> &[Waypoint];

    fn bounds(&self) -> Result<Bounds> {
        bounds(self.points())
    }

    /// Sum of consecutive point distances in metres.
    fn total_distance(&self) -> f64 {
        total_distance(self.points())
    }

    fn total_duration(&self) -> TimeDelta {
        total_duration(self.points())
    }

    fn moving_duration(&self) -> TimeDelta {
        moving_duration(self.points())
    }

    /// Distance over time across every pair with a positive duration.
    fn avg_speed(&self) -> Result<f64> {
        avg_speed(std::iter::once(self.points()))
    }

    fn avg_moving_speed(&self) -> Result<f64> {
        avg_moving_speed(std::iter::once(self.points()))
    }

    fn max_speed(&self) -> Result<f64> {
        max_of(pair_speeds(self.points()), "maximum speed")
    }

    fn min_speed(&self) -> Result<f64> {
        min_of(pair_speeds(self.points()), "minimum speed")
    }

    fn speed_profile(&self) -> impl Iterator<Item = (DateTime<Utc>, f64)> + Clone + '_ {
        speed_profile(self.points())
    }

    /// Mean over the points that carry an elevation.
    fn avg_elevation(&self) -> Result<f64> {
        mean_of(elevations(self.points()), "average elevation")
    }

    fn max_elevation(&self) -> Result<f64> {
        max_of(elevations(self.points()), "maximum elevation")
    }

    fn min_elevation(&self) -> Result<f64> {
        min_of(elevations(self.points()), "minimum elevation")
    }

    fn diff_elevation(&self) -> Result<f64> {
        Ok(self.max_elevation()? - self.min_elevation()?)
    }

    fn total_ascent(&self) -> f64 {
        ascent_descent(self.points()).0
    }

    fn total_descent(&self) -> f64 {
        ascent_descent(self.points()).1
    }

    fn elevation_profile(&self) -> impl Iterator<Item = (f64, f64)> + Clone + '_ {
        elevation_profile(std::iter::once(self.points()))
    }
}

impl PointSequence for TrackSegment {
    fn points(&self) -> &[Waypoint] {
        &self.points
    }
}

impl PointSequence for Route {
    fn points(&self) -> &[Waypoint] {
        &self.points
    }
}

fn avg_speed<'a>(runs: impl Iterator<Item = &'a [Waypoint]>) -> Result<f64> {
    let (dist, secs) = runs
        .flat_map(timed_pairs)
        .fold((0.0, 0.0), |(dist, secs), (d, s)| (dist + d, secs + s));
    if secs > 0.0 {
        Ok(dist / secs)
    } else {
        Err(GpxError::EmptySequence {
            statistic: "average speed",
        })
    }
}

fn avg_moving_speed<'a>(runs: impl Iterator<Item = &'a [Waypoint]> + Clone) -> Result<f64> {
    let secs = seconds(runs.clone().map(moving_duration).fold(TimeDelta::zero(), |a, d| a + d));
    if secs > 0.0 {
        Ok(runs.map(moving_distance).sum::<f64>() / secs)
    } else {
        Err(GpxError::EmptySequence {
            statistic: "average moving speed",
        })
    }
}

impl Waypoint {
    pub fn distance_to(&self, other: &Waypoint) -> f64 {
        distance(self, other)
    }

    pub fn bearing_to(&self, other: &Waypoint) -> f64 {
        bearing(self, other)
    }

    pub fn duration_to(&self, other: &Waypoint) -> TimeDelta {
        duration(self, other)
    }

    pub fn speed_to(&self, other: &Waypoint) -> f64 {
        speed(self, other)
    }

    pub fn gain_to(&self, other: &Waypoint) -> f64 {
        elevation_gain(self, other)
    }

    pub fn slope_to(&self, other: &Waypoint) -> f64 {
        slope(self, other)
    }
}

/// Track-level aggregates across all segments. Nothing is measured across
/// the gap between two segments.
impl Track {
    fn runs(&self) -> impl Iterator<Item = &[Waypoint]> + Clone + '_ {
        self.segments.iter().map(|seg| seg.points.as_slice())
    }

    fn all_points(&self) -> impl Iterator<Item = &Waypoint> + '_ {
        self.segments.iter().flat_map(|seg| seg.points.iter())
    }

    pub fn bounds(&self) -> Result<Bounds> {
        bounds_of(self.all_points())
    }

    pub fn total_distance(&self) -> f64 {
        self.segments.iter().map(PointSequence::total_distance).sum()
    }

    /// Sum of each segment's first-to-last duration.
    pub fn total_duration(&self) -> TimeDelta {
        self.segments
            .iter()
            .map(PointSequence::total_duration)
            .fold(TimeDelta::zero(), |acc, d| acc + d)
    }

    pub fn moving_duration(&self) -> TimeDelta {
        self.segments
            .iter()
            .map(PointSequence::moving_duration)
            .fold(TimeDelta::zero(), |acc, d| acc + d)
    }

    pub fn avg_speed(&self) -> Result<f64> {
        avg_speed(self.runs())
    }

    pub fn avg_moving_speed(&self) -> Result<f64> {
        avg_moving_speed(self.runs())
    }

    pub fn max_speed(&self) -> Result<f64> {
        max_of(self.runs().flat_map(pair_speeds), "maximum speed")
    }

    pub fn min_speed(&self) -> Result<f64> {
        min_of(self.runs().flat_map(pair_speeds), "minimum speed")
    }

    pub fn speed_profile(&self) -> impl Iterator<Item = (DateTime<Utc>, f64)> + Clone + '_ {
        self.runs().flat_map(speed_profile)
    }

    /// Mean over every elevation-bearing point of every segment.
    pub fn avg_elevation(&self) -> Result<f64> {
        mean_of(self.all_points().filter_map(Positioned::elevation), "average elevation")
    }

    pub fn max_elevation(&self) -> Result<f64> {
        max_of(self.all_points().filter_map(Positioned::elevation), "maximum elevation")
    }

    pub fn min_elevation(&self) -> Result<f64> {
        min_of(self.all_points().filter_map(Positioned::elevation), "minimum elevation")
    }

    pub fn diff_elevation(&self) -> Result<f64> {
        Ok(self.max_elevation()? - self.min_elevation()?)
    }

    pub fn total_ascent(&self) -> f64 {
        self.segments.iter().map(PointSequence::total_ascent).sum()
    }

    pub fn total_descent(&self) -> f64 {
        self.segments.iter().map(PointSequence::total_descent).sum()
    }

    pub fn elevation_profile(&self) -> impl Iterator<Item = (f64, f64)> + Clone + '_ {
        elevation_profile(self.runs())
    }

    /// All aggregates at once; statistics undefined for this track are `None`.
    pub fn summary(&self) -> TrackSummary {
        TrackSummary {
            name: self.name.clone(),
            distance: self.total_distance(),
            duration: seconds(self.total_duration()),
            moving_duration: seconds(self.moving_duration()),
            avg_speed: self.avg_speed().ok(),
            avg_moving_speed: self.avg_moving_speed().ok(),
            max_speed: self.max_speed().ok(),
            min_speed: self.min_speed().ok(),
            avg_elevation: self.avg_elevation().ok(),
            max_elevation: self.max_elevation().ok(),
            min_elevation: self.min_elevation().ok(),
            total_ascent: self.total_ascent(),
            total_descent: self.total_descent(),
        }
    }
}

/// Aggregate statistics of one track. Distances in metres, durations in
/// seconds, speeds in metres per second.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackSummary {
    pub name: Option<String>,
    pub distance: f64,
    pub duration: f64,
    pub moving_duration: f64,
    pub avg_speed: Option<f64>,
    pub avg_moving_speed: Option<f64>,
    pub max_speed: Option<f64>,
    pub min_speed: Option<f64>,
    pub avg_elevation: Option<f64>,
    pub max_elevation: Option<f64>,
    pub min_elevation: Option<f64>,
    pub total_ascent: f64,
    pub total_descent: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(lat: f64, lon: f64) -> Waypoint {
        Waypoint::from_degrees(lat, lon).unwrap()
    }

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 6, 0, 0).unwrap() + TimeDelta::seconds(secs)
    }

    fn segment(points: Vec<Waypoint>) -> TrackSegment {
        TrackSegment::new(points)
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        let p = at(35.0, 139.0);
        assert_eq!(distance(&p, &p), 0.0);
    }

    #[test]
    fn test_one_degree_of_longitude_at_equator() {
        let d = distance(&at(0.0, 0.0), &at(0.0, 1.0));
        assert!((d - 111_319.49).abs() < 1.0, "{d}");
    }

    #[test]
    fn test_distance_is_symmetric() {
        let p = at(35.0, 139.0);
        let q = at(36.2, 140.7);
        assert!((distance(&p, &q) - distance(&q, &p)).abs() < 1e-6);
    }

    #[test]
    fn test_custom_radius_scales_distance() {
        let p = at(0.0, 0.0);
        let q = at(0.0, 1.0);
        let half = distance_with_radius(&p, &q, DEFAULT_EARTH_RADIUS / 2.0);
        assert!((half * 2.0 - distance(&p, &q)).abs() < 1e-6);
    }

    #[test]
    fn test_bearing_cardinal_directions() {
        let origin = at(0.0, 0.0);
        assert!((bearing(&origin, &at(1.0, 0.0)) - 0.0).abs() < 1e-9);
        assert!((bearing(&origin, &at(0.0, 1.0)) - 90.0).abs() < 1e-9);
        assert!((bearing(&origin, &at(-1.0, 0.0)) - 180.0).abs() < 1e-9);
        assert!((bearing(&origin, &at(0.0, -1.0)) - 270.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_timestamps_give_zero_duration() {
        let p = at(0.0, 0.0).with_time(t(0));
        let q = at(0.0, 0.001);
        assert_eq!(duration(&p, &q), TimeDelta::zero());
        assert!(speed(&p, &q).is_infinite());
    }

    #[test]
    fn test_speed_gain_and_slope() {
        let p = at(0.0, 0.0).with_time(t(0)).with_ele(100.0).unwrap();
        let q = at(0.0, 0.001).with_time(t(10)).with_ele(105.0).unwrap();
        let d = p.distance_to(&q);
        assert!((p.speed_to(&q) - d / 10.0).abs() < 1e-9);
        assert_eq!(p.gain_to(&q), 5.0);
        assert!((p.slope_to(&q) - 5.0 / d * 100.0).abs() < 1e-9);
        assert_eq!(p.duration_to(&q), TimeDelta::seconds(10));
        assert_eq!(at(0.0, 0.0).gain_to(&q), 0.0);
    }

    #[test]
    fn test_ascent_descent_sign_convention() {
        let seg = segment(vec![
            at(0.0, 0.0).with_ele(10.0).unwrap(),
            at(0.0, 0.001).with_ele(12.0).unwrap(),
            at(0.0, 0.002).with_ele(9.0).unwrap(),
        ]);
        assert_eq!(seg.total_ascent(), 2.0);
        assert_eq!(seg.total_descent(), 3.0);
        assert_eq!(seg.diff_elevation().unwrap(), 3.0);
    }

    #[test]
    fn test_ascent_skips_points_without_elevation() {
        let seg = segment(vec![
            at(0.0, 0.0).with_ele(10.0).unwrap(),
            at(0.0, 0.001),
            at(0.0, 0.002).with_ele(15.0).unwrap(),
        ]);
        assert_eq!(seg.total_ascent(), 5.0);
        assert_eq!(seg.total_descent(), 0.0);
    }

    #[test]
    fn test_avg_elevation_counts_only_elevation_points() {
        let seg = segment(vec![
            at(0.0, 0.0).with_ele(10.0).unwrap(),
            at(0.0, 0.001),
            at(0.0, 0.002).with_ele(20.0).unwrap(),
        ]);
        assert_eq!(seg.avg_elevation().unwrap(), 15.0);
        assert_eq!(seg.min_elevation().unwrap(), 10.0);
        assert_eq!(seg.max_elevation().unwrap(), 20.0);
    }

    #[test]
    fn test_empty_sequence_is_degenerate() {
        let seg = TrackSegment::default();
        assert_eq!(seg.total_distance(), 0.0);
        assert_eq!(seg.total_duration(), TimeDelta::zero());
        assert!(matches!(seg.avg_elevation(), Err(GpxError::EmptySequence { .. })));
        assert!(matches!(seg.max_speed(), Err(GpxError::EmptySequence { .. })));
        assert!(matches!(seg.min_speed(), Err(GpxError::EmptySequence { .. })));
        assert!(matches!(seg.avg_speed(), Err(GpxError::EmptySequence { .. })));
        assert!(matches!(seg.bounds(), Err(GpxError::EmptySequence { .. })));
        assert_eq!(seg.elevation_profile().count(), 0);
    }

    #[test]
    fn test_durations_and_speeds() {
        // ~111 m per 0.001 degree of longitude at the equator
        let seg = segment(vec![
            at(0.0, 0.0).with_time(t(0)),
            at(0.0, 0.001).with_time(t(10)),
            at(0.0, 0.001).with_time(t(70)),
            at(0.0, 0.003).with_time(t(90)),
        ]);
        assert_eq!(seg.total_duration(), TimeDelta::seconds(90));
        // the 60 s standstill is not moving
        assert_eq!(seg.moving_duration(), TimeDelta::seconds(30));

        let first = distance(&seg.points[0], &seg.points[1]) / 10.0;
        let last = distance(&seg.points[2], &seg.points[3]) / 20.0;
        assert!((seg.max_speed().unwrap() - first.max(last)).abs() < 1e-9);
        assert_eq!(seg.min_speed().unwrap(), 0.0);

        let total = seg.total_distance();
        assert!((seg.avg_speed().unwrap() - total / 90.0).abs() < 1e-9);
        assert!((seg.avg_moving_speed().unwrap() - total / 30.0).abs() < 1e-9);

        let profile: Vec<_> = seg.speed_profile().collect();
        assert_eq!(profile.len(), 3);
        assert_eq!(profile[0].0, t(10));
        assert!((profile[0].1 - first).abs() < 1e-9);
    }

    #[test]
    fn test_total_duration_uses_first_and_last_timed_points() {
        let seg = segment(vec![
            at(0.0, 0.0),
            at(0.0, 0.001).with_time(t(5)),
            at(0.0, 0.002).with_time(t(65)),
            at(0.0, 0.003),
        ]);
        assert_eq!(seg.total_duration(), TimeDelta::seconds(60));
    }

    #[test]
    fn test_speed_profile_skips_zero_durations() {
        let seg = segment(vec![
            at(0.0, 0.0).with_time(t(0)),
            at(0.0, 0.001).with_time(t(0)),
            at(0.0, 0.002),
        ]);
        assert_eq!(seg.speed_profile().count(), 0);
        assert!(seg.avg_speed().is_err());
    }

    #[test]
    fn test_elevation_profile_accumulates_between_elevation_points() {
        let seg = segment(vec![
            at(0.0, 0.0).with_ele(10.0).unwrap(),
            at(0.0, 0.001),
            at(0.0, 0.002).with_ele(12.0).unwrap(),
            at(0.0, 0.003).with_ele(11.0).unwrap(),
        ]);
        let profile: Vec<(f64, f64)> = seg.elevation_profile().collect();
        assert_eq!(profile.len(), 3);
        assert_eq!(profile[0], (0.0, 10.0));
        let jump = distance(&seg.points[0], &seg.points[2]);
        assert!((profile[1].0 - jump).abs() < 1e-9);
        assert_eq!(profile[1].1, 12.0);
        assert!(profile[2].0 > profile[1].0);

        // restartable: a second pass and a cloned pass give the same values
        let again: Vec<(f64, f64)> = seg.elevation_profile().collect();
        assert_eq!(profile, again);
        let iter = seg.elevation_profile();
        assert_eq!(iter.clone().count(), iter.count());
    }

    #[test]
    fn test_track_aggregates_across_segments() {
        let trk = Track {
            segments: vec![
                segment(vec![
                    at(0.0, 0.0).with_time(t(0)).with_ele(10.0).unwrap(),
                    at(0.0, 0.001).with_time(t(10)).with_ele(12.0).unwrap(),
                ]),
                segment(vec![
                    at(1.0, 0.0).with_time(t(100)).with_ele(30.0).unwrap(),
                    at(1.0, 0.001).with_time(t(130)).with_ele(20.0).unwrap(),
                    at(1.0, 0.002).with_time(t(160)).with_ele(20.0).unwrap(),
                ]),
            ],
            ..Track::default()
        };

        let expected: f64 = trk.segments.iter().map(|s| s.total_distance()).sum();
        assert_eq!(trk.total_distance(), expected);
        // 10 s + 60 s, the gap between segments is not counted
        assert_eq!(trk.total_duration(), TimeDelta::seconds(70));
        assert_eq!(trk.total_ascent(), 2.0);
        assert_eq!(trk.total_descent(), 10.0);
        // pooled over all five points, not the mean of per-segment means
        assert_eq!(trk.avg_elevation().unwrap(), 92.0 / 5.0);
        assert_eq!(trk.max_elevation().unwrap(), 30.0);
        assert_eq!(trk.min_elevation().unwrap(), 10.0);
        assert_eq!(trk.diff_elevation().unwrap(), 20.0);
        assert_eq!(trk.speed_profile().count(), 3);

        let bounds = trk.bounds().unwrap();
        assert_eq!(bounds.min_lat.value(), 0.0);
        assert_eq!(bounds.max_lat.value(), 1.0);
        assert_eq!(bounds.max_lon.value(), 0.002);

        let profile: Vec<(f64, f64)> = trk.elevation_profile().collect();
        assert_eq!(profile.len(), 5);
        // the second segment starts at the running total, no gap distance
        assert_eq!(profile[2].0, profile[1].0);
        assert_eq!(profile[2].1, 30.0);
    }

    #[test]
    fn test_track_summary_maps_degenerate_statistics_to_none() {
        let trk = Track {
            name: Some("Walk".to_string()),
            segments: vec![segment(vec![at(0.0, 0.0), at(0.0, 0.001)])],
            ..Track::default()
        };
        let summary = trk.summary();
        assert_eq!(summary.name.as_deref(), Some("Walk"));
        assert!(summary.distance > 100.0);
        assert_eq!(summary.duration, 0.0);
        assert_eq!(summary.avg_speed, None);
        assert_eq!(summary.max_elevation, None);

        let json = serde_json::to_value(&summary).unwrap();
        assert!(json.get("movingDuration").is_some());
        assert!(json["avgSpeed"].is_null());
    }

    #[test]
    fn test_route_shares_sequence_statistics() {
        let rte = Route {
            points: vec![at(0.0, 0.0), at(0.0, 1.0)],
            ..Route::default()
        };
        assert!((rte.total_distance() - 111_319.49).abs() < 1.0);
    }
}
