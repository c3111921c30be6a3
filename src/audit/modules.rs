//! Mapping from import names to the distributions that provide them.

use crate::manifest::normalize;

use anyhow::bail;
use std::collections::BTreeMap;

/// Import names whose distribution is spelled differently.
const ALIASES: &[(&str, &str)] = &[
    ("Crypto", "pycryptodome"),
    ("OpenSSL", "pyopenssl"),
    ("PIL", "pillow"),
    ("attr", "attrs"),
    ("bs4", "beautifulsoup4"),
    ("cv2", "opencv-python"),
    ("dateutil", "python-dateutil"),
    ("docx", "python-docx"),
    ("dotenv", "python-dotenv"),
    ("ffmpeg", "ffmpeg-python"),
    ("fitz", "pymupdf"),
    ("google.protobuf", "protobuf"),
    ("jwt", "pyjwt"),
    ("magic", "python-magic"),
    ("multipart", "python-multipart"),
    ("serial", "pyserial"),
    ("skimage", "scikit-image"),
    ("sklearn", "scikit-learn"),
    ("vertexai", "google-cloud-aiplatform"),
    ("yaml", "pyyaml"),
];

/// Python standard-library top-level modules (sorted), including modules
/// removed in recent releases that older code still imports.
const STDLIB: &[&str] = &[
    "__future__", "_thread", "abc", "aifc", "antigravity", "argparse", "array", "ast",
    "asynchat", "asyncio", "asyncore", "atexit", "audioop", "base64", "bdb", "binascii",
    "bisect", "builtins", "bz2", "cProfile", "calendar", "cgi", "cgitb", "chunk",
    "cmath", "cmd", "code", "codecs", "codeop", "collections", "colorsys", "compileall",
    "concurrent", "configparser", "contextlib", "contextvars", "copy", "copyreg",
    "crypt", "csv", "ctypes", "curses", "dataclasses", "datetime", "dbm", "decimal",
    "difflib", "dis", "distutils", "doctest", "email", "encodings", "ensurepip", "enum",
    "errno", "faulthandler", "fcntl", "filecmp", "fileinput", "fnmatch", "fractions",
    "ftplib", "functools", "gc", "genericpath", "getopt", "getpass", "gettext", "glob",
    "graphlib", "grp", "gzip", "hashlib", "heapq", "hmac", "html", "http", "idlelib",
    "imaplib", "imghdr", "imp", "importlib", "inspect", "io", "ipaddress", "itertools",
    "json", "keyword", "lib2to3", "linecache", "locale", "logging", "lzma", "mailbox",
    "mailcap", "marshal", "math", "mimetypes", "mmap", "modulefinder", "msilib",
    "msvcrt", "multiprocessing", "netrc", "nis", "nntplib", "nt", "ntpath",
    "nturl2path", "numbers", "opcode", "operator", "optparse", "os", "ossaudiodev",
    "pathlib", "pdb", "pickle", "pickletools", "pipes", "pkgutil", "platform",
    "plistlib", "poplib", "posix", "posixpath", "pprint", "profile", "pstats", "pty",
    "pwd", "py_compile", "pyclbr", "pydoc", "pydoc_data", "pyexpat", "queue", "quopri",
    "random", "re", "readline", "reprlib", "resource", "rlcompleter", "runpy", "sched",
    "secrets", "select", "selectors", "shelve", "shlex", "shutil", "signal", "site",
    "smtpd", "smtplib", "sndhdr", "socket", "socketserver", "spwd", "sqlite3",
    "sre_compile", "sre_constants", "sre_parse", "ssl", "stat", "statistics", "string",
    "stringprep", "struct", "subprocess", "sunau", "symtable", "sys", "sysconfig",
    "syslog", "tabnanny", "tarfile", "telnetlib", "tempfile", "termios", "textwrap",
    "this", "threading", "time", "timeit", "tkinter", "token", "tokenize", "tomllib",
    "trace", "traceback", "tracemalloc", "tty", "turtle", "turtledemo", "types",
    "typing", "unicodedata", "unittest", "urllib", "uu", "uuid", "venv", "warnings",
    "wave", "weakref", "webbrowser", "winreg", "winsound", "wsgiref", "xdrlib", "xml",
    "xmlrpc", "zipapp", "zipfile", "zipimport", "zlib", "zoneinfo",
];

pub fn is_stdlib(module: &str) -> bool {
    let top = module.split('.').next().unwrap_or(module);
    STDLIB.binary_search(&top).is_ok()
}

/// Import name -> normalized distribution name.
#[derive(Debug, Clone)]
pub struct ModuleMap {
    aliases: BTreeMap<String, String>,
}

impl Default for ModuleMap {
    fn default() -> Self {
        Self {
            aliases: ALIASES
                .iter()
                .map(|(m, d)| (m.to_string(), normalize(d)))
                .collect(),
        }
    }
}

impl ModuleMap {
    pub fn insert(&mut self, module: &str, distribution: &str) {
        self.aliases
            .insert(module.trim().to_string(), normalize(distribution));
    }

    /// Parse and apply a `module=distribution` override.
    pub fn apply_override(&mut self, spec: &str) -> anyhow::Result<()> {
        let Some((module, dist)) = spec.split_once('=') else {
            bail!("invalid module mapping {:?}: expected module=package", spec);
        };
        if module.trim().is_empty() || dist.trim().is_empty() {
            bail!("invalid module mapping {:?}: expected module=package", spec);
        }
        self.insert(module, dist);
        Ok(())
    }

    /// Normalized distribution for a module key. Unmapped modules are
    /// assumed to share their distribution's name.
    pub fn distribution_for(&self, module: &str) -> String {
        if let Some(d) = self.aliases.get(module) {
            return d.clone();
        }
        // `google.cloud.storage` has no alias but a mapped prefix might.
        let top = module.split('.').next().unwrap_or(module);
        if top != module {
            if let Some(d) = self.aliases.get(top) {
                return d.clone();
            }
        }
        normalize(module)
    }
}
