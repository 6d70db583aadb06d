mod common;
use common::*;

#[test]
fn test_if_then() {
    assert_eq!(program("if(1<2) print(1) endif"), "1\n");
    assert_eq!(program("if(2<1) print(1) endif print(0)"), "0\n");
}

#[test]
fn test_if_else() {
    assert_eq!(program("if(false) print(1) else print(99) endif"), "99\n");
    assert_eq!(program("if(true) print(1) else print(99) endif"), "1\n");
}

#[test]
fn test_nested_if() {
    let source = "\
x:int=2
if(x>1)
  if(x>5)
    print(555)
  else
    print(222)
  endif
else
  print(111)
endif";
    assert_eq!(program(source), "222\n");
}

#[test]
fn test_empty_branches() {
    assert_eq!(program("if(true) else endif print(7)"), "7\n");
}

#[test]
fn test_if_assigns() {
    assert_eq!(program("x:int=0\nif(5>2) x=1 endif\nprint(x)"), "1\n");
    assert_eq!(program("x:int=0\nif(1<0) x=1 endif\nprint(x)"), "0\n");
}
