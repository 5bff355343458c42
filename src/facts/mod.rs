// src/facts/mod.rs

pub mod attendance;
pub mod song_time;

pub use attendance::{
    attendance_observations, build_fact_attendance, AttendanceStatus, FactAttendance, Observation,
};
pub use song_time::{build_fact_song_time, FactSongTime};
