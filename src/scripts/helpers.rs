//! Runtime helpers for lowered script syntax
//!
//! The transformer routes helper calls through a global `babelHelpers`
//! object. Bundles are plain scripts with no module loader, so the helpers a
//! bundle uses are defined in front of it on a single line of ES5.

use std::collections::BTreeSet;

/// Global the transformer calls helpers through.
pub const HELPER_GLOBAL: &str = "babelHelpers";

struct HelperSource {
    name: &'static str,
    /// Other helpers this body calls
    requires: &'static [&'static str],
    body: &'static str,
}

const HELPERS: &[HelperSource] = &[
    HelperSource {
        name: "asyncToGenerator",
        requires: &[],
        body: "function(fn){return function(){var self=this,args=arguments;return new Promise(function(resolve,reject){var gen=fn.apply(self,args);function step(key,arg){var info,value;try{info=gen[key](arg);value=info.value}catch(error){reject(error);return}if(info.done){resolve(value)}else{Promise.resolve(value).then(next,raise)}}function next(value){step(\"next\",value)}function raise(error){step(\"throw\",error)}next(undefined)})}}",
    },
    HelperSource {
        name: "toPropertyKey",
        requires: &[],
        body: "function(arg){return typeof arg===\"symbol\"?arg:String(arg)}",
    },
    HelperSource {
        name: "defineProperty",
        requires: &["toPropertyKey"],
        body: "function(obj,key,value){key=babelHelpers.toPropertyKey(key);if(key in obj){Object.defineProperty(obj,key,{value:value,enumerable:true,configurable:true,writable:true})}else{obj[key]=value}return obj}",
    },
    HelperSource {
        name: "objectSpread2",
        requires: &["defineProperty"],
        body: "function(target){for(var i=1;i<arguments.length;i++){var source=arguments[i]!=null?arguments[i]:{};var keys=Object.keys(source);if(typeof Object.getOwnPropertySymbols===\"function\"){keys=keys.concat(Object.getOwnPropertySymbols(source).filter(function(sym){return Object.getOwnPropertyDescriptor(source,sym).enumerable}))}for(var k=0;k<keys.length;k++){babelHelpers.defineProperty(target,keys[k],source[keys[k]])}}return target}",
    },
    HelperSource {
        name: "objectWithoutProperties",
        requires: &[],
        body: "function(source,excluded){if(source==null)return{};var target={};for(var key in source){if(Object.prototype.hasOwnProperty.call(source,key)&&excluded.indexOf(key)<0)target[key]=source[key]}if(typeof Object.getOwnPropertySymbols===\"function\"){var symbols=Object.getOwnPropertySymbols(source);for(var i=0;i<symbols.length;i++){var sym=symbols[i];if(excluded.indexOf(sym)<0&&Object.prototype.propertyIsEnumerable.call(source,sym))target[sym]=source[sym]}}return target}",
    },
    HelperSource {
        name: "objectDestructuringEmpty",
        requires: &[],
        body: "function(obj){if(obj==null)throw new TypeError(\"Cannot destructure \"+obj)}",
    },
    HelperSource {
        name: "extends",
        requires: &[],
        body: "function(target){for(var i=1;i<arguments.length;i++){var source=arguments[i];for(var key in source){if(Object.prototype.hasOwnProperty.call(source,key))target[key]=source[key]}}return target}",
    },
    HelperSource {
        name: "assertClassBrand",
        requires: &[],
        body: "function(brand,receiver,value){if(typeof brand===\"function\"?brand===receiver:brand.has(receiver))return arguments.length<3?receiver:value;throw new TypeError(\"Private element is not present on this object\")}",
    },
    HelperSource {
        name: "classPrivateFieldInitSpec",
        requires: &[],
        body: "function(obj,map,value){if(map.has(obj))throw new TypeError(\"Cannot initialize the same private elements twice on an object\");map.set(obj,value)}",
    },
    HelperSource {
        name: "classPrivateMethodInitSpec",
        requires: &[],
        body: "function(obj,set){if(set.has(obj))throw new TypeError(\"Cannot initialize the same private elements twice on an object\");set.add(obj)}",
    },
    HelperSource {
        name: "classPrivateFieldGet2",
        requires: &["assertClassBrand"],
        body: "function(map,receiver){return map.get(babelHelpers.assertClassBrand(map,receiver))}",
    },
    HelperSource {
        name: "classPrivateFieldSet2",
        requires: &["assertClassBrand"],
        body: "function(map,receiver,value){map.set(babelHelpers.assertClassBrand(map,receiver),value);return value}",
    },
    HelperSource {
        name: "checkInRHS",
        requires: &[],
        body: "function(value){if(Object(value)!==value)throw new TypeError(\"right-hand side of 'in' should be an object, got \"+(value!==null?typeof value:\"null\"));return value}",
    },
    HelperSource {
        name: "readOnlyError",
        requires: &[],
        body: "function(name){throw new TypeError('\"'+name+'\" is read-only')}",
    },
    HelperSource {
        name: "writeOnlyError",
        requires: &[],
        body: "function(name){throw new TypeError('\"'+name+'\" is write-only')}",
    },
];

fn find(name: &str) -> Option<&'static HelperSource> {
    HELPERS.iter().find(|helper| helper.name == name)
}

/// Build the line that defines `names` and the helpers they call.
///
/// Returns `None` when nothing is needed. A strict bundle keeps its
/// `"use strict"` directive in first position. Fails on the first helper with
/// no bundled implementation.
pub fn prelude<'n, I>(names: I, strict: bool) -> Result<Option<String>, String>
where
    I: IntoIterator<Item = &'n str>,
{
    let mut needed: BTreeSet<&'static str> = BTreeSet::new();
    let mut pending: Vec<&'n str> = names.into_iter().collect();
    pending.sort_unstable();

    while let Some(name) = pending.pop() {
        let helper = find(name).ok_or_else(|| {
            format!("syntax needs runtime helper '{}', which is not bundled; raise scripts.target", name)
        })?;
        if needed.insert(helper.name) {
            pending.extend(helper.requires.iter().copied());
        }
    }
    if needed.is_empty() {
        return Ok(None);
    }

    let entries: Vec<String> = HELPERS
        .iter()
        .filter(|helper| needed.contains(helper.name))
        .map(|helper| format!("{}:{}", helper.name, helper.body))
        .collect();
    let directive = if strict { "\"use strict\";" } else { "" };
    Ok(Some(format!("{}var {}={{{}}};\n", directive, HELPER_GLOBAL, entries.join(","))))
}
