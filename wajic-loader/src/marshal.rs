//! String/array marshalling primitives. Emitted only when the
//! verifier's feature flags request them — an unset flag leaves the
//! corresponding function entirely out of the loader.

/// `MSetViews()`: rebuild the typed array views over `MEM.buffer` after any
/// heap growth.
pub fn emit_set_views(out: &mut String) {
    out.push_str("function MSetViews() {\n");
    out.push_str("  var buf = MEM.buffer;\n");
    out.push_str("  MU8 = new Uint8Array(buf);\n");
    out.push_str("  MU16 = new Uint16Array(buf);\n");
    out.push_str("  MU32 = new Uint32Array(buf);\n");
    out.push_str("  MI32 = new Int32Array(buf);\n");
    out.push_str("  MF32 = new Float32Array(buf);\n");
    out.push_str("}\n");
}

/// `MStrPut`/`MStrGet`: UTF-8 encode/decode between JS strings and linear
/// memory.
pub fn emit_string_marshal(out: &mut String) {
    out.push_str(
        "function MStrPut(str, ptr, bufSize) {\n\
         \x20 var bytes = unescape(encodeURIComponent(str)) + '\\0';\n\
         \x20 var n = bytes.length;\n\
         \x20 if (bufSize !== undefined && n > bufSize) {\n\
         \x20\x20  n = bufSize;\n\
         \x20\x20  while (n > 0 && (bytes.charCodeAt(n - 1) & 0xC0) === 0x80) { n--; }\n\
         \x20\x20  bytes = bytes.slice(0, n) + '\\0';\n\
         \x20 }\n\
         \x20 var outPtr = ptr !== undefined ? ptr : ASM.malloc(bytes.length);\n\
         \x20 for (var i = 0; i < bytes.length; i++) { MU8[outPtr + i] = bytes.charCodeAt(i); }\n\
         \x20 return ptr !== undefined ? bytes.length - 1 : outPtr;\n\
         }\n\
         function MStrGet(ptr, length) {\n\
         \x20 var end = ptr;\n\
         \x20 if (length !== undefined) { end = ptr + length; }\n\
         \x20 else { while (MU8[end]) { end++; } }\n\
         \x20 var s = '';\n\
         \x20 for (var i = ptr; i < end; i++) { s += String.fromCharCode(MU8[i]); }\n\
         \x20 return decodeURIComponent(escape(s));\n\
         }\n",
    );
}

/// `MArrPut`: copy a typed array into a freshly `malloc`'d region.
pub fn emit_array_marshal(out: &mut String) {
    out.push_str(
        "function MArrPut(a) {\n\
         \x20 var ptr = ASM.malloc(a.length * a.BYTES_PER_ELEMENT);\n\
         \x20 new a.constructor(MEM.buffer, ptr, a.length).set(a);\n\
         \x20 return ptr;\n\
         }\n",
    );
}
