use std::process::Command;

use cocoa::base::{id, nil, BOOL, NO};
use objc::{class, msg_send, sel, sel_impl};
use tracing::debug;
use xwall_platform::{Result, SystemShell};

use crate::ffi::{box_err, ns_string};

pub struct MacShell;

impl SystemShell for MacShell {
    fn run(&self, program: &str, args: &[String]) -> Result<i32> {
        debug!("running {program} {}", args.join(" "));
        let status = Command::new(program).args(args).status().map_err(box_err)?;
        Ok(status.code().unwrap_or(-1))
    }

    fn open(&self, target: &str) -> Result<()> {
        unsafe {
            let url: id = msg_send![class!(NSURL), URLWithString: ns_string(target)];
            if url == nil {
                return Err(format!("invalid URL: {target}").into());
            }
            let workspace: id = msg_send![class!(NSWorkspace), sharedWorkspace];
            let opened: BOOL = msg_send![workspace, openURL: url];
            if opened == NO {
                return Err(format!("nothing handled {target}").into());
            }
        }
        Ok(())
    }
}
