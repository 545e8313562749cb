#![forbid(unsafe_code)]

mod evidence;
mod work_orders;
