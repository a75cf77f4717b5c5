// Pruned from `aya-tool generate` output: only the structs and fields
// the probes walk, in their kernel order. Regenerate against the
// target kernel's BTF when offsets move.

#![allow(non_camel_case_types, dead_code)]

use core::ffi::c_void;

#[repr(C)]
#[derive(Clone, Copy)]
pub struct ns_common {
	pub stashed: *mut c_void,
	pub ops: *const c_void,
	pub inum: u32,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct mnt_namespace {
	pub ns: ns_common,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct pid_namespace {
	pub ns: ns_common,
	pub level: u32,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct upid {
	pub nr: i32,
	pub ns: *mut pid_namespace,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct pid {
	pub count: i32,
	pub level: u32,
	pub numbers: [upid; 1],
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct nsproxy {
	pub count: i32,
	pub uts_ns: *mut c_void,
	pub ipc_ns: *mut c_void,
	pub mnt_ns: *mut mnt_namespace,
	pub pid_ns_for_children: *mut pid_namespace,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct task_struct {
	pub pid: i32,
	pub tgid: i32,
	pub real_parent: *mut task_struct,
	pub group_leader: *mut task_struct,
	pub thread_pid: *mut pid,
	pub nsproxy: *mut nsproxy,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct qstr {
	pub hash: u32,
	pub len: u32,
	pub name: *const u8,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct dentry {
	pub d_parent: *mut dentry,
	pub d_name: qstr,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct vfsmount {
	pub mnt_root: *mut dentry,
	pub mnt_sb: *mut c_void,
	pub mnt_flags: i32,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct mount {
	pub mnt_hash: [*mut c_void; 2],
	pub mnt_parent: *mut mount,
	pub mnt_mountpoint: *mut dentry,
	pub mnt: vfsmount,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct path {
	pub mnt: *mut vfsmount,
	pub dentry: *mut dentry,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct file {
	pub f_path: path,
}
