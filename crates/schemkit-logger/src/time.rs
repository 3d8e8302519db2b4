#[cfg(unix)]
use std::ffi::CStr;
use std::time::{SystemTime, UNIX_EPOCH};

#[cfg(unix)]
const TIME_FORMAT: &[u8] = b"%Y-%m-%d %H:%M:%S %Z\0";

/// Returns the current time in the format YYYY-MM-DD HH:MM:SS TZ
#[cfg(unix)]
pub fn now() -> String {
    let secs = unix_timestamp() as libc::time_t;

    let mut tm: libc::tm = unsafe { std::mem::zeroed() };
    let mut buf = [0 as libc::c_char; 100];

    unsafe {
        if libc::localtime_r(&secs, &mut tm).is_null() {
            return secs.to_string();
        }
        let written = libc::strftime(
            buf.as_mut_ptr(),
            buf.len(),
            TIME_FORMAT.as_ptr() as *const libc::c_char,
            &tm,
        );
        if written == 0 {
            return secs.to_string();
        }
        CStr::from_ptr(buf.as_ptr()).to_string_lossy().into_owned()
    }
}

/// Returns the current time in the format YYYY-MM-DD HH:MM:SS
#[cfg(windows)]
pub fn now() -> String {
    use windows_sys::Win32::Foundation::SYSTEMTIME;

    let mut tm: SYSTEMTIME = unsafe { std::mem::zeroed() };
    unsafe {
        windows_sys::Win32::System::SystemInformation::GetLocalTime(&mut tm);
    }
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
        tm.wYear, tm.wMonth, tm.wDay, tm.wHour, tm.wMinute, tm.wSecond
    )
}

#[cfg(not(any(unix, windows)))]
pub fn now() -> String {
    unix_timestamp().to_string()
}

/// Returns the current Unix timestamp in seconds
pub fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Returns the current Unix timestamp in milliseconds, as stored by Litematica and Sponge
pub fn unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_is_not_empty() {
        assert!(!now().is_empty());
    }

    #[test]
    fn test_millis_and_seconds_agree() {
        let secs = unix_timestamp();
        let millis = unix_millis();
        assert!((millis / 1000 - secs).abs() <= 1);
    }
}
