use std::ffi::{c_char, CStr};
use std::ptr;
use crate::boat::BoatDriver;
use crate::config::RigConfig;
use crate::error::Result;

//status codes returned by every call
pub const SAIL_OK: i32 = 1;
pub const SAIL_UNSUPPORTED: i32 = 0;
pub const SAIL_NULL_ARG: i32 = -1;
pub const SAIL_FAILED: i32 = -2;

pub struct SailDriver{
    inner: BoatDriver,
}

//a path ending in .toml is loaded, anything else is a preset name
fn resolve_rig(name: &str) -> Result<RigConfig>{
    if name.ends_with(".toml"){
        RigConfig::load(name)
    }else{
        RigConfig::preset(name)
    }
}

#[no_mangle]
pub unsafe extern "C" fn sail_driver_open(rig: *const c_char) -> *mut SailDriver{
    if rig.is_null(){
        return ptr::null_mut();
    }

    let name = match unsafe{ CStr::from_ptr(rig) }.to_str(){
        Ok(s) => s,
        Err(_) => return ptr::null_mut(),
    };

    match resolve_rig(name).and_then(BoatDriver::connect){
        Ok(inner) => Box::into_raw(Box::new(SailDriver{ inner })),
        Err(e) =>{
            log::error!("sail_driver_open({}) failed: {}", name, e);
            ptr::null_mut()
        }
    }
}

#[no_mangle]
pub unsafe extern "C" fn sail_driver_free(driver: *mut SailDriver){
    if !driver.is_null(){
        unsafe{ drop(Box::from_raw(driver)); }
    }
}

unsafe fn write_reading(reading: Result<Option<f64>>, out: *mut f64) -> i32{
    match reading{
        Ok(Some(value)) =>{
            unsafe{ *out = value; }
            SAIL_OK
        }
        Ok(None) => SAIL_UNSUPPORTED,
        Err(e) =>{
            log::warn!("sensor read failed: {}", e);
            SAIL_FAILED
        }
    }
}

unsafe fn read_sensor<F>(driver: *mut SailDriver, out: *mut f64, read: F) -> i32
where
    F: FnOnce(&BoatDriver) -> Result<Option<f64>>,
{
    if driver.is_null() || out.is_null(){
        return SAIL_NULL_ARG;
    }
    unsafe{
        let d = &*driver;
        write_reading(read(&d.inner), out)
    }
}

#[no_mangle]
pub unsafe extern "C" fn sail_driver_heading(driver: *mut SailDriver, out: *mut f64) -> i32{
    unsafe{ read_sensor(driver, out, |d| d.heading().map(Some)) }
}

#[no_mangle]
pub unsafe extern "C" fn sail_driver_pitch(driver: *mut SailDriver, out: *mut f64) -> i32{
    unsafe{ read_sensor(driver, out, |d| d.pitch()) }
}

#[no_mangle]
pub unsafe extern "C" fn sail_driver_roll(driver: *mut SailDriver, out: *mut f64) -> i32{
    unsafe{ read_sensor(driver, out, |d| d.roll()) }
}

#[no_mangle]
pub unsafe extern "C" fn sail_driver_wind_direction(driver: *mut SailDriver, out: *mut f64) -> i32{
    unsafe{ read_sensor(driver, out, |d| d.wind_direction()) }
}

#[no_mangle]
pub unsafe extern "C" fn sail_driver_apparent_wind_direction(driver: *mut SailDriver, out: *mut f64) -> i32{
    unsafe{ read_sensor(driver, out, |d| d.apparent_wind_direction()) }
}

#[no_mangle]
pub unsafe extern "C" fn sail_driver_wind_speed(driver: *mut SailDriver, out: *mut f64) -> i32{
    unsafe{ read_sensor(driver, out, |d| Ok(d.wind_speed())) }
}

#[no_mangle]
pub unsafe extern "C" fn sail_driver_position(
    driver: *mut SailDriver,
    out_lat: *mut f64,
    out_lon: *mut f64,
) -> i32{
    if driver.is_null() || out_lat.is_null() || out_lon.is_null(){
        return SAIL_NULL_ARG;
    }

    unsafe{
        let d = &*driver;
        let (lat, lon) = d.inner.position();
        *out_lat = lat;
        *out_lon = lon;
    }
    SAIL_OK
}

#[no_mangle]
pub unsafe extern "C" fn sail_driver_rudder(
    driver: *mut SailDriver,
    angle: f64,
    out_pwm: *mut i32,
) -> i32{
    if driver.is_null(){
        return SAIL_NULL_ARG;
    }

    unsafe{
        let d = &*driver;
        match d.inner.rudder(angle){
            Ok(pwm) =>{
                if !out_pwm.is_null(){
                    *out_pwm = pwm;
                }
                SAIL_OK
            }
            Err(e) =>{
                log::warn!("rudder({}) failed: {}", angle, e);
                SAIL_FAILED
            }
        }
    }
}

#[no_mangle]
pub unsafe extern "C" fn sail_driver_sail(
    driver: *mut SailDriver,
    angle: f64,
    out_pwm: *mut i32,
) -> i32{
    if driver.is_null(){
        return SAIL_NULL_ARG;
    }

    unsafe{
        let d = &*driver;
        match d.inner.sail(angle){
            Ok(Some(pwm)) =>{
                if !out_pwm.is_null(){
                    *out_pwm = pwm;
                }
                SAIL_OK
            }
            Ok(None) => SAIL_UNSUPPORTED,
            Err(e) =>{
                log::warn!("sail({}) failed: {}", angle, e);
                SAIL_FAILED
            }
        }
    }
}
