mod common;
use common::*;

#[test]
fn test_literal_and_index() {
    assert_eq!(program("a:arr=[10,20,30]\nprint(a[1])\nprint(a)"), "20\n[10, 20, 30]\n");
}

#[test]
fn test_store_element() {
    assert_eq!(program("a:arr=[1,2,3]\na[0]=a[2]*10\nprint(a)"), "[30, 2, 3]\n");
}

#[test]
fn test_arrays_are_shared() {
    let source = "\
a:arr=[1,2]
b:arr=a
b[0]=9
print(a[0])";
    assert_eq!(program(source), "9\n");
}

#[test]
fn test_array_argument() {
    let source = "\
sum:int=func(v:arr,n:int)
  s:int=0
  for(i:int=0;i<n;i=i+1) s=s+v[i] endfor
  ret s
endfunc
print(sum([4,5,6],3))";
    assert_eq!(program(source), "15\n");
}

#[test]
fn test_empty_array() {
    assert_eq!(program("a:arr=[]\nprint(a)"), "[]\n");
}

#[test]
fn test_out_of_bounds_halts() {
    let out = program("a:arr=[1,2,3]\nprint(a[0])\nprint(a[3])\nprint(4)");
    assert!(out.starts_with("1\nSUBSCRIPT OUT OF RANGE IN "));
    assert!(!out.contains("4\n"));
    let out = program("a:arr=[1]\na[-1]=2");
    assert!(out.starts_with("SUBSCRIPT OUT OF RANGE"));
}
